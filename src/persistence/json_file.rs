//! Flat JSON object on disk
//!
//! Written through a temp file and renamed into place so a crash mid-write
//! leaves the previous contents intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when it is missing or corrupt
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<BTreeMap<String, i64>>(&json) {
                Ok(values) => {
                    log::info!("Loaded {} saved values from {}", values.len(), path.display());
                    values
                }
                Err(e) => {
                    log::warn!("Corrupt save file {}: {}, starting fresh", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => {
                log::info!("No save file at {}, starting fresh", path.display());
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| CoreError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), CoreError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
