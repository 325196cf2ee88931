use std::{
    fs::{self, OpenOptions, rename, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::{Value, to_string_pretty};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::{Storage, StorageError};

const MAX_BACKUPS_PER_KEY: usize = 5;

/// Stores every key as `<dir>/<key>.json`
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn get_key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn get_lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    fn get_backup_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    fn get_backup_path(&self, key: &str) -> PathBuf {
        // Fixed width so names sort chronologically
        let nanos = jiff::Timestamp::now().as_nanosecond();
        self.get_backup_dir().join(format!("{key}-{nanos:020}.json"))
    }

    fn create_backup_dir(&self) -> Result<(), StorageError> {
        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;
        Ok(())
    }

    fn create_backup(&self, key: &str) -> Result<u64, StorageError> {
        let key_path = self.get_key_path(key);
        let file_exists = fs::exists(&key_path).map_err(|e| StorageError::BackupFailed {
            path: key_path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        self.create_backup_dir()?;

        let backup_path = self.get_backup_path(key);
        fs::copy(&key_path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path,
            source: e,
        })
    }

    fn cleanup_old_backups(&self, key: &str) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let prefix = format!("{key}-");
        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(MAX_BACKUPS_PER_KEY);
        if number_of_files_to_delete == 0 {
            return Ok(());
        }

        for file_path in &file_entries[0..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn lock_key(&self, key: &str) -> Result<fs::File, StorageError> {
        let lock_file_path = self.get_lock_path(key);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                key: key.to_string(),
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                key: key.to_string(),
                path: lock_file_path,
                source: e,
            })?;
        Ok(lock_file)
    }

    /// Moves a fully written temp file over the key file, backing up the old one first
    fn commit(&self, key: &str, temp_path: &Path) -> Result<(), StorageError> {
        let lock_file = self.lock_key(key)?;

        self.create_backup(key)?;
        self.cleanup_old_backups(key)?;

        let key_path = self.get_key_path(key);
        rename(temp_path, &key_path).map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: key_path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: key_path.clone(),
            source: e,
        })?;

        debug!(key, path = %key_path.display(), "saved key");
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load(&self, key: &str) -> Option<Value> {
        let path = self.get_key_path(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                let error = StorageError::LoadFailed {
                    key: key.to_string(),
                    path,
                    source: e,
                };
                warn!(%error, "treating unreadable key as absent");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "treating malformed JSON as absent");
                None
            }
        }
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let json = to_string_pretty(value).map_err(|e| StorageError::SerializeFailed {
            key: key.to_string(),
            source: e,
        })?;

        let temp_path = self.dir.join(format!("{key}.json.tmp.{}", Uuid::new_v4()));
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            key: key.to_string(),
            path: temp_path.clone(),
            source: e,
        })?;

        if let Err(e) = self.commit(key, &temp_path) {
            if let Err(cleanup) = fs::remove_file(&temp_path)
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(key, path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
            }
            return Err(e);
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key_path = self.get_key_path(key);
        match fs::remove_file(&key_path) {
            Ok(()) => {
                debug!(key, path = %key_path.display(), "removed key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                key: key.to_string(),
                path: key_path,
                source: e,
            }),
        }
    }
}
