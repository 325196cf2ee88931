use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub mod json;
#[cfg(test)]
pub mod memory;

/// Key holding the ordered activity list
pub const ACTIVITIES_KEY: &str = "activities";
/// Key holding the pending deletion, absent when there is nothing to restore
pub const PENDING_DELETION_KEY: &str = "pending-deletion";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load '{key}' from '{path}': {source}")]
    LoadFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save '{key}' to '{path}': {source}")]
    SaveFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{key}' to JSON: {source}")]
    SerializeFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to remove '{key}' at '{path}': {source}")]
    RemoveFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable key/value seam. Reads never fail: anything unreadable is absent.
pub trait Storage {
    fn load(&self, key: &str) -> Option<Value>;
    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
