//! Integration tests for the ShopSmart storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-smart-integration-tests
//! ```
//!
//! The tests run the stores against real file storage in a temporary
//! directory and in-memory fakes of the backend API, so no server is needed.
//!
//! # Test Categories
//!
//! - `restart` - State surviving a provider restart, fail-open restore
//! - `provider_scope` - Handles after their provider is gone
//! - `checkout_flow` - Register, shop, and place an order end to end

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use shop_smart_storefront::testing::InMemoryDirectory;
use shop_smart_storefront::{FileStorage, StoreProvider};

/// A data directory that lives as long as the test.
pub struct TestEnv {
    dir: TempDir,
    pub directory: Arc<InMemoryDirectory>,
}

impl TestEnv {
    /// Fresh data directory and an empty customer directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_directory(InMemoryDirectory::default())
    }

    #[must_use]
    pub fn with_directory(directory: InMemoryDirectory) -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
            directory: Arc::new(directory),
        }
    }

    /// Path of the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the file backing a storage key.
    #[must_use]
    pub fn entry_path(&self, key: &str) -> std::path::PathBuf {
        self.data_dir().join(format!("{key}.json"))
    }

    /// Start a provider over this environment, as a fresh process would.
    #[must_use]
    pub fn provider(&self) -> StoreProvider {
        let storage = Arc::new(FileStorage::new(self.data_dir()));
        StoreProvider::new(storage, self.directory.clone())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
