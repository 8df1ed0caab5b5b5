// src/core/flag_log.rs

//! The CTF flag notebook: flags and free-form notes typed at the console, kept in
//! `<workspace>/ctf_data.json`.

use crate::{
    core::persist::{self, PersistError},
    models::{CapturedFlag, FlagNote, FlagNotebookData, default_flag_category},
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlagLogError {
    #[error("Nothing to store.")]
    Empty,
    #[error("Flags must be a single line of printable ASCII.")]
    InvalidFlag,
    #[error("No captured flag with id '{0}'.")]
    UnknownFlag(String),
    #[error("Failed to save the flag notebook: {0}")]
    Persistence(#[from] PersistError),
    #[error("Unsupported export format '{0}' (expected json, txt or csv).")]
    UnsupportedFormat(String),
    #[error("Failed to build the CSV export: {0}")]
    Csv(#[from] csv::Error),
}

pub type FlagLogResult<T> = Result<T, FlagLogError>;

/// Totals shown by `ctf stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotebookSummary {
    pub flags: usize,
    pub submitted: usize,
    pub notes: usize,
}

/// File formats accepted by `ctf export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The `captured_flags` map as stored.
    Json,
    /// One `[id] flag (challenge)` line per flag.
    Txt,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Txt => "txt",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = FlagLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            _ => Err(FlagLogError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct FlagNotebook {
    path: Option<PathBuf>,
    data: FlagNotebookData,
}

impl FlagNotebook {
    /// Opens the notebook at `path`, starting empty when it cannot be read.
    pub fn load(path: &Path) -> Self {
        let data = persist::read_json::<FlagNotebookData>(path)
            .unwrap_or_else(|e| {
                log::warn!("Flag notebook '{}' is unreadable: {}", path.display(), e);
                None
            })
            .unwrap_or_default();
        Self {
            path: Some(path.to_path_buf()),
            data,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: FlagNotebookData::default(),
        }
    }

    /// Stores `text` verbatim as a new flag and returns it.
    /// The category falls back to `manual` when not given.
    pub fn capture(
        &mut self,
        text: &str,
        challenge: Option<&str>,
        category: Option<&str>,
    ) -> FlagLogResult<CapturedFlag> {
        if text.trim().is_empty() {
            return Err(FlagLogError::Empty);
        }
        if !text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(FlagLogError::InvalidFlag);
        }

        let id = self
            .data
            .captured_flags
            .values()
            .map(|f| f.id)
            .max()
            .unwrap_or(0)
            + 1;
        let flag = CapturedFlag {
            id,
            flag: text.to_string(),
            challenge: challenge.unwrap_or_default().to_string(),
            category: category.map_or_else(default_flag_category, str::to_string),
            timestamp: Utc::now().to_rfc3339(),
            submitted: false,
        };
        self.data
            .captured_flags
            .insert(id.to_string(), flag.clone());
        self.save()?;
        Ok(flag)
    }

    pub fn add_note(&mut self, text: &str) -> FlagLogResult<()> {
        if text.trim().is_empty() {
            return Err(FlagLogError::Empty);
        }
        self.data.notes.push(FlagNote {
            text: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
        self.save()
    }

    pub fn mark_submitted(&mut self, id: &str) -> FlagLogResult<&CapturedFlag> {
        let key = id.trim().to_string();
        match self.data.captured_flags.get_mut(&key) {
            Some(flag) => flag.submitted = true,
            None => return Err(FlagLogError::UnknownFlag(key)),
        }
        self.save()?;
        self.data
            .captured_flags
            .get(&key)
            .ok_or(FlagLogError::UnknownFlag(key))
    }

    /// Flags in id order, optionally only the submitted ones.
    pub fn flags(&self, submitted_only: bool) -> Vec<&CapturedFlag> {
        let mut flags: Vec<&CapturedFlag> = self
            .data
            .captured_flags
            .values()
            .filter(|f| !submitted_only || f.submitted)
            .collect();
        flags.sort_by_key(|f| f.id);
        flags
    }

    pub fn notes(&self) -> &[FlagNote] {
        &self.data.notes
    }

    pub fn summary(&self) -> NotebookSummary {
        NotebookSummary {
            flags: self.data.captured_flags.len(),
            submitted: self
                .data
                .captured_flags
                .values()
                .filter(|f| f.submitted)
                .count(),
            notes: self.data.notes.len(),
        }
    }

    /// Writes every captured flag to `flags_export_<timestamp>.<ext>` in `dir`.
    pub fn export(&self, format: ExportFormat, dir: &Path) -> FlagLogResult<PathBuf> {
        let payload = match format {
            ExportFormat::Json => serde_json::to_vec_pretty(&self.data.captured_flags)
                .map_err(PersistError::Serialize)?,
            ExportFormat::Txt => self
                .flags(false)
                .iter()
                .map(|f| {
                    let challenge = if f.challenge.is_empty() {
                        "N/A"
                    } else {
                        f.challenge.as_str()
                    };
                    format!("[{}] {} ({})\n", f.id, f.flag, challenge)
                })
                .collect::<String>()
                .into_bytes(),
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                for flag in self.flags(false) {
                    writer.serialize(flag)?;
                }
                writer
                    .into_inner()
                    .map_err(|e| {
                        PersistError::Io(std::io::Error::new(e.error().kind(), e.to_string()))
                    })?
            }
        };

        let path = dir.join(format!(
            "flags_export_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        ));
        persist::write_atomic(&path, &payload)?;
        log::info!(
            "Exported {} flag(s) to '{}'",
            self.data.captured_flags.len(),
            path.display()
        );
        Ok(path)
    }

    fn save(&self) -> FlagLogResult<()> {
        if let Some(path) = &self.path {
            persist::write_json_atomic(path, &self.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_capture_stores_text_verbatim() {
        let mut notebook = FlagNotebook::in_memory();
        let flag = notebook
            .capture("flag{with  two spaces}", None, None)
            .unwrap();
        assert_eq!(flag.id, 1);
        assert_eq!(flag.flag, "flag{with  two spaces}");
        assert!(!flag.submitted);
        assert_eq!(flag.challenge, "");
        assert_eq!(flag.category, "manual");

        let second = notebook
            .capture("CTF{second}", Some("pwn-1"), Some("pwn"))
            .unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.challenge, "pwn-1");
        assert_eq!(second.category, "pwn");
    }

    #[test]
    fn test_flags_without_details_load_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ctf_data.json");
        fs::write(
            &path,
            r#"{"captured_flags": {"1": {"id": 1, "flag": "f{x}", "timestamp": "t"}}}"#,
        )
        .unwrap();

        let notebook = FlagNotebook::load(&path);
        let flags = notebook.flags(false);
        assert_eq!(flags[0].challenge, "");
        assert_eq!(flags[0].category, "manual");
    }

    #[test]
    fn test_export_formats() {
        let tmp = tempfile::tempdir().unwrap();
        let mut notebook = FlagNotebook::in_memory();
        notebook
            .capture("flag{a,b}", Some("login"), Some("web"))
            .unwrap();
        notebook.capture("flag{c}", None, None).unwrap();

        let txt = notebook.export(ExportFormat::Txt, tmp.path()).unwrap();
        assert!(txt.file_name().unwrap().to_string_lossy().starts_with("flags_export_"));
        assert_eq!(
            fs::read_to_string(&txt).unwrap(),
            "[1] flag{a,b} (login)\n[2] flag{c} (N/A)\n"
        );

        let csv = notebook.export(ExportFormat::Csv, tmp.path()).unwrap();
        let content = fs::read_to_string(&csv).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("id,flag,challenge,category,timestamp,submitted")
        );
        assert!(lines.next().unwrap().starts_with("1,\"flag{a,b}\",login,web,"));

        let json = notebook.export(ExportFormat::Json, tmp.path()).unwrap();
        let back: std::collections::BTreeMap<String, CapturedFlag> =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back["1"].challenge, "login");
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(FlagLogError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_capture_rejects_empty_and_control_chars() {
        let mut notebook = FlagNotebook::in_memory();
        assert!(matches!(
            notebook.capture("  ", None, None),
            Err(FlagLogError::Empty)
        ));
        assert!(matches!(
            notebook.capture("flag{a\tb}", None, None),
            Err(FlagLogError::InvalidFlag)
        ));
        assert!(notebook.flags(false).is_empty());
    }

    #[test]
    fn test_mark_and_filter_submitted() {
        let mut notebook = FlagNotebook::in_memory();
        notebook.capture("flag{a}", None, None).unwrap();
        notebook.capture("flag{b}", None, None).unwrap();

        assert!(notebook.mark_submitted("2").unwrap().submitted);
        assert!(matches!(
            notebook.mark_submitted("9"),
            Err(FlagLogError::UnknownFlag(_))
        ));

        let submitted = notebook.flags(true);
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].flag, "flag{b}");
        assert_eq!(
            notebook.summary(),
            NotebookSummary {
                flags: 2,
                submitted: 1,
                notes: 0
            }
        );
    }

    #[test]
    fn test_notebook_persists_across_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ctf_data.json");

        let mut notebook = FlagNotebook::load(&path);
        notebook.capture("flag{persisted}", None, None).unwrap();
        notebook.add_note("admin panel at /secret").unwrap();

        let reloaded = FlagNotebook::load(&path);
        assert_eq!(reloaded.flags(false).len(), 1);
        assert_eq!(reloaded.notes()[0].text, "admin panel at /secret");
    }

    #[test]
    fn test_corrupted_notebook_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ctf_data.json");
        fs::write(&path, "[1, 2").unwrap();

        let notebook = FlagNotebook::load(&path);
        assert_eq!(notebook.summary().flags, 0);
    }
}
