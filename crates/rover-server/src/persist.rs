//! File-backed key-value storage for host builds.
//!
//! Entries live in memory; `commit` writes them as one JSON document,
//! replacing the previous file atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use rover_core::{KvStorage, StorageError, StoredValue};

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, StoredValue>,
}

impl FileStorage {
    /// Opens `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StorageError::Backend(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(target: "init-network", "no state file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StorageError::Backend(format!("{}: {}", path.display(), e))),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStorage for FileStorage {
    fn get(&self, key: &str) -> Result<StoredValue, StorageError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| StorageError::Backend(format!("{}: {}", self.path.display(), e)))?;
        debug!(target: "init-network", entries = self.entries.len(), "state written to {}", self.path.display());
        Ok(())
    }
}
