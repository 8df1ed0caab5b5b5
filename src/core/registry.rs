//! # Shortcut Registry
//!
//! The in-memory catalogue of shortcuts. It is filled once at startup from the
//! definition files of `shortcuts_dir` and only read afterwards.

use crate::{
    constants::SHORTCUT_FILE_EXTENSION,
    models::{Shortcut, ShortcutDef, ShortcutFile},
};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("A shortcut in '{path}' has no name.")]
    MissingName { path: String },
}

type RegistryResult<T> = Result<T, RegistryError>;

/// Named command templates, keyed and iterated by name.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    shortcuts: BTreeMap<String, Shortcut>,
}

impl ShortcutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from definitions. A later definition with the same name overwrites
    /// the earlier one.
    pub fn from_shortcuts(shortcuts: impl IntoIterator<Item = Shortcut>) -> Self {
        let mut registry = Self::new();
        for shortcut in shortcuts {
            registry.insert(shortcut);
        }
        registry
    }

    /// Loads every definition file of `dir`, in path order.
    ///
    /// Files are read and parsed in parallel; merging happens sequentially so that
    /// duplicates resolve the same way on every run. Broken files are logged and skipped.
    /// A missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> RegistryResult<Self> {
        if !dir.is_dir() {
            log::warn!(
                "Shortcuts directory '{}' not found. Registry is empty.",
                dir.display()
            );
            return Ok(Self::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(SHORTCUT_FILE_EXTENSION))
            })
            .collect();
        files.sort();

        let parsed: Vec<(PathBuf, RegistryResult<Vec<Shortcut>>)> = files
            .par_iter()
            .map(|path| (path.clone(), load_file(path)))
            .collect();

        let mut registry = Self::new();
        for (path, result) in parsed {
            match result {
                Ok(shortcuts) => {
                    log::debug!(
                        "Loaded {} shortcut(s) from '{}'",
                        shortcuts.len(),
                        path.display()
                    );
                    for shortcut in shortcuts {
                        registry.insert(shortcut);
                    }
                }
                Err(e) => log::warn!("Skipping shortcut file '{}': {}", path.display(), e),
            }
        }
        Ok(registry)
    }

    /// Adds a shortcut, replacing any shortcut with the same name.
    pub fn insert(&mut self, shortcut: Shortcut) {
        if let Some(previous) = self.shortcuts.insert(shortcut.name.clone(), shortcut) {
            log::debug!("Shortcut '{}' was redefined.", previous.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Shortcut> {
        self.shortcuts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shortcuts.contains_key(name)
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.shortcuts.keys().map(String::as_str).collect()
    }

    /// All shortcuts, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Shortcut> {
        self.shortcuts.values()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }
}

/// Parses one definition file into shortcuts.
fn load_file(path: &Path) -> RegistryResult<Vec<Shortcut>> {
    let content = fs::read_to_string(path)?;
    parse_definitions(&content, path)
}

fn parse_definitions(content: &str, path: &Path) -> RegistryResult<Vec<Shortcut>> {
    let file: ShortcutFile = toml::from_str(content).map_err(|source| RegistryError::TomlParse {
        path: path.display().to_string(),
        source,
    })?;

    match file {
        ShortcutFile::List { shortcuts } => shortcuts
            .into_iter()
            .map(|def| {
                let name = def.name.clone().ok_or_else(|| RegistryError::MissingName {
                    path: path.display().to_string(),
                })?;
                Ok(into_shortcut(name, def))
            })
            .collect(),
        ShortcutFile::Named(map) => Ok(map
            .into_iter()
            .map(|(key, def)| {
                let name = def.name.clone().unwrap_or(key);
                into_shortcut(name, def)
            })
            .collect()),
    }
}

fn into_shortcut(name: String, def: ShortcutDef) -> Shortcut {
    Shortcut {
        name,
        template: def.cmd,
        description: def.desc,
        safe: def.safe,
        tags: def.tags.into_iter().collect(),
        notes: def.notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_layout() {
        let content = r#"
            [[shortcuts]]
            name = "enum-full"
            cmd = "nmap -sV {target}"
            desc = "Full scan"
            tags = ["recon", "nmap"]

            [[shortcuts]]
            name = "wipe"
            cmd = "rm -rf {workspace}/*"
            safe = false
        "#;
        let shortcuts = parse_definitions(content, Path::new("list.toml")).unwrap();
        assert_eq!(shortcuts.len(), 2);
        assert_eq!(shortcuts[0].name, "enum-full");
        assert!(shortcuts[0].tags.contains("nmap"));
        assert!(!shortcuts[1].safe);
    }

    #[test]
    fn test_parse_named_layout_uses_table_key() {
        let content = r#"
            [enum-web]
            cmd = "gobuster dir -u {target}"
            desc = "Web enumeration"
        "#;
        let shortcuts = parse_definitions(content, Path::new("named.toml")).unwrap();
        assert_eq!(shortcuts.len(), 1);
        assert_eq!(shortcuts[0].name, "enum-web");
        assert!(shortcuts[0].safe);
    }

    #[test]
    fn test_list_entry_without_name_is_rejected() {
        let content = "[[shortcuts]]\ncmd = \"ls\"\n";
        let result = parse_definitions(content, Path::new("bad.toml"));
        assert!(matches!(result, Err(RegistryError::MissingName { .. })));
    }

    #[test]
    fn test_load_from_dir_later_file_overwrites() {
        // --- Setup ---
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("a.toml"),
            "[[shortcuts]]\nname = \"scan\"\ncmd = \"first\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("b.toml"),
            "[[shortcuts]]\nname = \"scan\"\ncmd = \"second\"\n",
        )
        .unwrap();
        fs::write(tmp.path().join("broken.toml"), "[[shortcuts]\n").unwrap();
        fs::write(tmp.path().join("readme.md"), "not a shortcut").unwrap();

        // --- Execute ---
        let registry = ShortcutRegistry::load_from_dir(tmp.path()).unwrap();

        // --- Assert ---
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("scan").unwrap().template, "second");
    }

    #[test]
    fn test_load_from_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ShortcutRegistry::load_from_dir(&tmp.path().join("absent")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_are_sorted() {
        let make = |name: &str| Shortcut {
            name: name.to_string(),
            template: "true".to_string(),
            description: String::new(),
            safe: true,
            tags: Default::default(),
            notes: None,
        };
        let registry = ShortcutRegistry::from_shortcuts(vec![make("zeta"), make("alpha")]);
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
