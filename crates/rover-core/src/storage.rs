//! Typed key-value persistence abstraction.
//!
//! Mirrors the shape of flash-backed key-value stores: typed getters and
//! setters addressed by short string keys, with writes made durable by an
//! explicit `commit`. Platforms provide their own backend:
//! - Host: [`MemoryStorage`], optionally flushed to a file by the server crate
//! - Device: the flash key-value partition
//!
//! All methods are synchronous to support embedded platforms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while accessing persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Nothing is stored under the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A value exists but has a different type.
    #[error("type mismatch for key: {0}")]
    TypeMismatch(String),

    /// The backend failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Abstract typed key-value storage.
pub trait KvStorage: Send {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Load a raw value by key.
    fn get(&self, key: &str) -> Result<StoredValue, StorageError>;

    fn get_u8(&self, key: &str) -> Result<u8, StorageError> {
        match self.get(key)? {
            StoredValue::U8(v) => Ok(v),
            _ => Err(StorageError::TypeMismatch(key.to_string())),
        }
    }

    fn get_u32(&self, key: &str) -> Result<u32, StorageError> {
        match self.get(key)? {
            StoredValue::U32(v) => Ok(v),
            _ => Err(StorageError::TypeMismatch(key.to_string())),
        }
    }

    fn get_u64(&self, key: &str) -> Result<u64, StorageError> {
        match self.get(key)? {
            StoredValue::U64(v) => Ok(v),
            _ => Err(StorageError::TypeMismatch(key.to_string())),
        }
    }

    fn get_str(&self, key: &str) -> Result<String, StorageError> {
        match self.get(key)? {
            StoredValue::Str(v) => Ok(v),
            _ => Err(StorageError::TypeMismatch(key.to_string())),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store a raw value. Not durable until [`KvStorage::commit`].
    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StorageError>;

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StorageError> {
        self.set(key, StoredValue::U8(value))
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.set(key, StoredValue::U32(value))
    }

    fn set_u64(&mut self, key: &str, value: u64) -> Result<(), StorageError> {
        self.set(key, StoredValue::U64(value))
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set(key, StoredValue::Str(value.to_string()))
    }

    /// Make all previous writes durable.
    fn commit(&mut self) -> Result<(), StorageError>;
}

/// A typed persisted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    U8(u8),
    U32(u32),
    U64(u64),
    Str(String),
}

/// In-memory storage.
///
/// Writes are visible immediately; `commit` snapshots them as durable,
/// which is what a restart observes via [`MemoryStorage::durable`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, StoredValue>,
    durable: BTreeMap<String, StoredValue>,
    commits: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with durable entries.
    pub fn from_entries(entries: BTreeMap<String, StoredValue>) -> Self {
        Self {
            durable: entries.clone(),
            entries,
            commits: 0,
        }
    }

    /// Entries as of the last commit.
    pub fn durable(&self) -> &BTreeMap<String, StoredValue> {
        &self.durable
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl KvStorage for MemoryStorage {
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
        self.durable = self.entries.clone();
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_roundtrip() {
        let mut storage = MemoryStorage::new();
        storage.set_u8("flag", 1).unwrap();
        storage.set_u32("addr", 0xC0A8_0401).unwrap();
        storage.set_u64("big", 10_000).unwrap();
        storage.set_str("name", "rover").unwrap();

        assert_eq!(storage.get_u8("flag").unwrap(), 1);
        assert_eq!(storage.get_u32("addr").unwrap(), 0xC0A8_0401);
        assert_eq!(storage.get_u64("big").unwrap(), 10_000);
        assert_eq!(storage.get_str("name").unwrap(), "rover");
    }

    #[test]
    fn test_missing_and_mismatched() {
        let mut storage = MemoryStorage::new();
        assert!(storage.get_u8("nope").unwrap_err().is_not_found());

        storage.set_u8("flag", 1).unwrap();
        assert_eq!(
            storage.get_u32("flag"),
            Err(StorageError::TypeMismatch("flag".to_string()))
        );
    }

    #[test]
    fn test_commit_snapshots_durable_state() {
        let mut storage = MemoryStorage::new();
        storage.set_u8("a", 1).unwrap();
        assert!(storage.durable().is_empty());

        storage.commit().unwrap();
        assert_eq!(storage.durable().get("a"), Some(&StoredValue::U8(1)));
        assert_eq!(storage.commit_count(), 1);
    }
}
