//! ShopSmart storefront client state.
//!
//! Holds the shopping cart and customer session for one storefront client,
//! keeps both in durable storage between runs, and talks to the ShopSmart
//! REST backend for customer lookup, the catalog, and orders.
//!
//! Everything is reached through a [`StoreProvider`]:
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use shop_smart_storefront::{FileStorage, HttpApiClient, StoreProvider, StorefrontConfig};
//! # async fn demo() -> shop_smart_storefront::error::Result<()> {
//! let config = StorefrontConfig::from_env()?;
//! let api = Arc::new(HttpApiClient::new(&config)?);
//! let storage = Arc::new(FileStorage::new(&config.data_dir));
//!
//! let provider = StoreProvider::new(storage, api);
//! let handle = provider.handle();
//! println!("{} items in cart", handle.cart()?.total_item_count());
//! provider.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod orders;
pub mod persistence;
pub mod session;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{ApiError, CustomerDirectory, HttpApiClient, OrderApi, ProductCatalog};
pub use cart::{CartLineItem, CartState, CartStore};
pub use catalog::{ProductSort, browse};
pub use checkout::{CheckoutError, CheckoutGate, OrderSummary, place_order};
pub use config::{ConfigError, StorefrontConfig};
pub use context::{ContextError, StoreHandle, StoreProvider};
pub use error::StorefrontError;
pub use orders::{OrderError, order_details, order_history};
pub use session::{SessionError, SessionState, SessionStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
