//! Store provider and handles.
//!
//! A [`StoreProvider`] owns the single cart and session for an application
//! scope. Components receive a [`StoreHandle`], which holds only a weak
//! reference: once the provider is dropped, every accessor on the handle
//! fails with [`ContextError::OutsideProvider`] instead of silently handing
//! out a detached store.
//!
//! A store resolved earlier and kept by the caller stays readable, but from
//! that point on it rejects every change and logs the rejection as an error.

use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::CustomerDirectory;
use crate::cart::CartStore;
use crate::persistence::Persister;
use crate::session::SessionStore;
use crate::storage::KeyValueStorage;

/// A store was requested without a live provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("{store} store used outside its provider")]
    OutsideProvider { store: &'static str },
}

struct ProviderInner {
    cart: Arc<CartStore>,
    session: Arc<SessionStore>,
}

/// Owner of the application's cart and session.
///
/// Both stores are restored from `storage` when the provider is created and
/// write back to it through one shared background writer.
pub struct StoreProvider {
    inner: Arc<ProviderInner>,
    persister: Persister,
    worker: JoinHandle<()>,
}

impl StoreProvider {
    /// Restore both stores and start the persistence writer.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(storage: Arc<dyn KeyValueStorage>, directory: Arc<dyn CustomerDirectory>) -> Self {
        let (persister, worker) = Persister::spawn(Arc::clone(&storage));

        let cart = Arc::new(CartStore::load(storage.as_ref(), persister.clone()));
        let session = Arc::new(SessionStore::load(
            storage.as_ref(),
            directory,
            persister.clone(),
        ));

        info!(
            cart_items = cart.total_item_count(),
            authenticated = session.is_authenticated(),
            "Stores ready"
        );

        Self {
            inner: Arc::new(ProviderInner { cart, session }),
            persister,
            worker,
        }
    }

    /// A handle for components inside this provider's scope.
    #[must_use]
    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The cart store.
    #[must_use]
    pub fn cart(&self) -> Arc<CartStore> {
        Arc::clone(&self.inner.cart)
    }

    /// The session store.
    #[must_use]
    pub fn session(&self) -> Arc<SessionStore> {
        Arc::clone(&self.inner.session)
    }

    /// Wait for queued writes to reach storage.
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    /// Close the stores, flush pending writes and stop the writer.
    ///
    /// Handles obtained from this provider fail afterwards.
    pub async fn shutdown(mut self) {
        self.persister.close();
        self.persister.flush().await;
        self.worker.abort();
        let _ = (&mut self.worker).await;
        debug!("Store provider shut down");
    }
}

impl Drop for StoreProvider {
    fn drop(&mut self) {
        // Writes already queued still reach storage; the writer exits once
        // the last store is gone.
        self.persister.close();
    }
}

/// Weak reference to a provider's stores.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Weak<ProviderInner>,
}

impl StoreHandle {
    /// A handle that was never attached to a provider.
    #[must_use]
    pub const fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    /// The cart store.
    ///
    /// # Errors
    ///
    /// `OutsideProvider` if the provider has been dropped.
    pub fn cart(&self) -> Result<Arc<CartStore>, ContextError> {
        self.inner
            .upgrade()
            .map(|inner| Arc::clone(&inner.cart))
            .ok_or(ContextError::OutsideProvider { store: "cart" })
    }

    /// The session store.
    ///
    /// # Errors
    ///
    /// `OutsideProvider` if the provider has been dropped.
    pub fn session(&self) -> Result<Arc<SessionStore>, ContextError> {
        self.inner
            .upgrade()
            .map(|inner| Arc::clone(&inner.session))
            .ok_or(ContextError::OutsideProvider { store: "session" })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{CART_KEY, MemoryStorage};
    use crate::testing::{InMemoryDirectory, customer, product};

    fn provider(storage: &Arc<MemoryStorage>, directory: InMemoryDirectory) -> StoreProvider {
        StoreProvider::new(storage.clone(), Arc::new(directory))
    }

    #[tokio::test]
    async fn test_handles_share_one_store() {
        let storage = Arc::new(MemoryStorage::new());
        let provider = provider(&storage, InMemoryDirectory::default());
        let a = provider.handle();
        let b = a.clone();

        a.cart().unwrap().add_item(&product(1, "Mug", 999), 2);

        assert_eq!(b.cart().unwrap().total_item_count(), 2);
        assert_eq!(provider.cart().item_quantity(product(1, "Mug", 999).id), 2);
    }

    #[tokio::test]
    async fn test_handle_fails_after_provider_dropped() {
        let storage = Arc::new(MemoryStorage::new());
        let handle = provider(&storage, InMemoryDirectory::default()).handle();

        assert_eq!(
            handle.cart().err(),
            Some(ContextError::OutsideProvider { store: "cart" })
        );
        assert_eq!(
            handle.session().err(),
            Some(ContextError::OutsideProvider { store: "session" })
        );
    }

    #[test]
    fn test_detached_handle() {
        let err = StoreHandle::detached().cart().err().unwrap();
        assert_eq!(err.to_string(), "cart store used outside its provider");
    }

    #[tokio::test]
    async fn test_shutdown_flushes_writes() {
        let storage = Arc::new(MemoryStorage::new());
        let provider = provider(&storage, InMemoryDirectory::default());
        let handle = provider.handle();

        provider.cart().add_item(&product(4, "Tea", 500), 1);
        provider.shutdown().await;

        assert!(storage.raw(CART_KEY).unwrap().contains("\"quantity\":1"));
        assert!(handle.cart().is_err());
    }

    #[tokio::test]
    async fn test_kept_stores_reject_changes_after_shutdown() {
        let storage = Arc::new(MemoryStorage::new());
        let directory = InMemoryDirectory::with_customers(vec![customer(1, "a@x.com")]);
        let provider = provider(&storage, directory);
        let cart = provider.cart();
        let session = provider.session();
        cart.add_item(&product(1, "Mug", 999), 1);

        provider.shutdown().await;

        cart.add_item(&product(4, "Tea", 500), 3);
        assert_eq!(cart.total_item_count(), 1);
        let err = session.login("a@x.com").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "session store used outside its provider"
        );
    }

    #[tokio::test]
    async fn test_drop_closes_kept_stores() {
        let storage = Arc::new(MemoryStorage::new());
        let provider = provider(&storage, InMemoryDirectory::default());
        let cart = provider.cart();
        drop(provider);

        cart.add_item(&product(1, "Mug", 999), 2);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_restores_both_stores() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let directory = InMemoryDirectory::with_customers(vec![customer(1, "a@x.com")]);
            let provider = provider(&storage, directory);
            provider.cart().add_item(&product(1, "Mug", 999), 3);
            provider.session().login("a@x.com").await.unwrap();
            provider.shutdown().await;
        }

        let provider = provider(&storage, InMemoryDirectory::default());
        assert_eq!(provider.cart().total_item_count(), 3);
        assert_eq!(provider.session().customer().unwrap().id.as_i32(), 1);
    }
}
