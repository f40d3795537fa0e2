//! The local-storage surface the session is persisted to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl StorageOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// String-keyed, string-valued persistent storage.
///
/// Implementations must apply a [`write_batch`](KeyValueStore::write_batch)
/// all-or-nothing.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn write_batch(&self, ops: &[StorageOp]) -> Result<()>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_batch(&[StorageOp::set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write_batch(&[StorageOp::remove(key)])
    }
}

/// In-process store; contents are lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().expect("memory store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn write_batch(&self, ops: &[StorageOp]) -> Result<()> {
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        for op in ops {
            match op {
                StorageOp::Set { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                StorageOp::Remove { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
