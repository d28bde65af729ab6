//! Durable local key-value storage.
//!
//! The storefront keeps two entries between runs: the cart line items and
//! the logged-in customer. Storage is only read once at startup and written
//! on change; in-memory state is authoritative while the process runs.
//!
//! Values are strings (JSON documents), mirroring browser local storage.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key for the serialized cart line items.
pub const CART_KEY: &str = "shopSmart_cart";

/// Storage key for the serialized session customer.
pub const CUSTOMER_KEY: &str = "shopSmart_customer";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Value could not be encoded or decoded.
    #[error("storage serialization error for {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string-valued key-value store that survives process restarts.
///
/// Implementations are blocking; the persistence worker calls them from
/// `spawn_blocking`.
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Read the value stored under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON entry, failing open.
///
/// Absence, read errors, and parse errors all yield `None`; errors are logged
/// and never propagated.
pub fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored entry");
            return None;
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored entry, starting empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Stored entry is corrupt, starting empty");
            None
        }
    }
}

// =============================================================================
// File Storage
// =============================================================================

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary file that is renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `dir`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process storage for tests and throwaway sessions.
///
/// Reads and writes can be made to fail to exercise fail-open paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes and removals fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing failure injection.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Seed a raw value, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
    }

    fn check_writes(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.raw(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writes()?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_writes()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get_item(CART_KEY).unwrap(), None);

        storage.set_item(CART_KEY, "[1,2,3]").unwrap();
        assert_eq!(storage.get_item(CART_KEY).unwrap().as_deref(), Some("[1,2,3]"));
        assert!(dir.path().join("nested/shopSmart_cart.json").exists());

        storage.set_item(CART_KEY, "[]").unwrap();
        assert_eq!(storage.get_item(CART_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_remove_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.remove_item(CUSTOMER_KEY).unwrap();
        storage.set_item(CUSTOMER_KEY, "{}").unwrap();
        storage.remove_item(CUSTOMER_KEY).unwrap();
        assert_eq!(storage.get_item(CUSTOMER_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                storage.set_item(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_load_json_fails_open() {
        let storage = MemoryStorage::new();
        assert_eq!(load_json::<Vec<u32>>(&storage, CART_KEY), None);

        storage.insert_raw(CART_KEY, "{not json");
        assert_eq!(load_json::<Vec<u32>>(&storage, CART_KEY), None);

        storage.insert_raw(CART_KEY, "[4,5]");
        assert_eq!(load_json::<Vec<u32>>(&storage, CART_KEY), Some(vec![4, 5]));

        storage.set_fail_reads(true);
        assert_eq!(load_json::<Vec<u32>>(&storage, CART_KEY), None);
    }

    #[test]
    fn test_memory_storage_write_failures() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(storage.set_item(CART_KEY, "[]").is_err());
        assert!(storage.remove_item(CART_KEY).is_err());
        assert_eq!(storage.raw(CART_KEY), None);
    }
}
