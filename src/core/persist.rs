// src/core/persist.rs

//! JSON documents rewritten in full on every change.
//!
//! Writes go to a temporary file in the destination directory which is then renamed
//! over the target, so a crash mid-write leaves either the old or the new document.

use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::paths::{self, PathError};

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Malformed JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Error with temporary file: {0}")]
    TempFile(#[from] tempfile::PersistError),
    #[error("'{0}' has no parent directory.")]
    NoParent(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Reads and parses a JSON document. `Ok(None)` when the file does not exist or is blank.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> PersistResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| PersistError::Json {
            path: path.display().to_string(),
            source,
        })
}

/// Serializes `value` as pretty JSON and atomically replaces `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PersistResult<()> {
    let payload = serde_json::to_vec_pretty(value).map_err(PersistError::Serialize)?;
    write_atomic(path, &payload)
}

/// Atomically replaces `path` with `payload`, creating the parent directory if needed.
pub fn write_atomic(path: &Path, payload: &[u8]) -> PersistResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    paths::ensure_dir(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(payload)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    log::trace!("Wrote {} bytes to '{}'", payload.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_then_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("alpha".to_string(), 1u32);

        write_json_atomic(&path, &doc).unwrap();
        let back: Option<BTreeMap<String, u32>> = read_json(&path).unwrap();
        assert_eq!(back, Some(doc));
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let back: Option<BTreeMap<String, u32>> = read_json(&tmp.path().join("nope.json")).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_read_malformed_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let result: PersistResult<Option<BTreeMap<String, u32>>> = read_json(&path);
        assert!(matches!(result, Err(PersistError::Json { .. })));
    }

    #[test]
    fn test_write_leaves_no_temp_files_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();

        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
