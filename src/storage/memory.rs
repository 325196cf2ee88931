use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
    path::PathBuf,
};

use serde_json::Value;

use crate::storage::{Storage, StorageError};

/// In-process storage for tests. Writes can be switched off to mimic a full disk.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, Value>>,
    fail_writes: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: Value) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value);
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::SaveFailed {
                key: key.to_string(),
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::StorageFull, "quota exceeded"),
            });
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
