//! Whole-collection JSON snapshots.
//!
//! Both the daily log and the vector store persist as a single pretty JSON
//! array that is read whole and rewritten whole. Writes go to a sibling
//! temp file first and are renamed into place.

use archie_core::error::StorageError;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

/// Outcome of reading a snapshot file.
#[derive(Debug)]
pub enum Snapshot<T> {
    /// No file yet.
    Missing,
    /// Parsed successfully.
    Loaded(Vec<T>),
    /// The file exists but is not a valid array of `T`.
    Corrupt(String),
}

impl<T> Snapshot<T> {
    /// The records, treating missing and corrupt files as empty.
    pub fn into_records(self) -> Vec<T> {
        match self {
            Self::Loaded(records) => records,
            Self::Missing | Self::Corrupt(_) => Vec::new(),
        }
    }
}

pub fn read<T: DeserializeOwned>(path: &Path) -> Result<Snapshot<T>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::Missing),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if content.trim().is_empty() {
        return Ok(Snapshot::Loaded(Vec::new()));
    }
    Ok(match serde_json::from_str(&content) {
        Ok(records) => Snapshot::Loaded(records),
        Err(e) => Snapshot::Corrupt(e.to_string()),
    })
}

pub fn write<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let data = serde_json::to_string_pretty(records).map_err(|e| StorageError::Serialize {
        what: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let tmp = sibling(path, "tmp");
    std::fs::write(&tmp, data).map_err(|e| StorageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Move a corrupt file out of the way so the next write does not destroy it.
pub fn preserve_corrupt(path: &Path) -> Result<PathBuf, StorageError> {
    let target = sibling(path, "corrupt");
    std::fs::rename(path, &target).map_err(|e| StorageError::io(path, e))?;
    Ok(target)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
