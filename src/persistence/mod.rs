//! Key/value persistence
//!
//! The core only ever stores small integers (the best score). Backends:
//! - `MemoryStore`: process lifetime, used by tests and when no save path
//!   is configured
//! - `JsonFileStore`: a flat JSON object on disk
//!
//! Reads never fail: an unavailable store yields the caller's default.

mod json_file;

use std::collections::BTreeMap;

pub use json_file::JsonFileStore;

use crate::error::CoreError;

/// Integer key/value storage
pub trait KeyValueStore {
    /// Stored value, or `default` when missing or unreadable
    fn get_int(&self, key: &str, default: i64) -> i64;
    fn set_int(&mut self, key: &str, value: i64) -> Result<(), CoreError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: i64) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value);
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), CoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
