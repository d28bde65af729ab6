//! Command implementations.
//!
//! Each command works against the stores reached through [`App::handle`] and
//! prints its result to stdout. Logs go to stderr.

#![allow(clippy::print_stdout)]

pub mod account;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use std::sync::Arc;

use shop_smart_storefront::{OrderApi, ProductCatalog, StoreHandle, StorefrontError};

/// Everything a command needs.
pub struct App {
    pub handle: StoreHandle,
    pub catalog: Arc<dyn ProductCatalog>,
    pub orders: Arc<dyn OrderApi>,
}

/// Result type for commands.
pub type CommandResult = Result<(), StorefrontError>;

/// Trim an optional argument, treating blank as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Arc;

    use shop_smart_storefront::testing::{InMemoryDirectory, RecordingOrders, StaticCatalog};
    use shop_smart_storefront::{MemoryStorage, StoreProvider};

    use super::App;

    /// A provider over memory storage plus an `App` wired to the fakes.
    pub struct TestApp {
        pub provider: StoreProvider,
        pub orders: Arc<RecordingOrders>,
        pub app: App,
    }

    impl TestApp {
        pub fn new(
            directory: InMemoryDirectory,
            catalog: StaticCatalog,
            orders: RecordingOrders,
        ) -> Self {
            let provider = StoreProvider::new(Arc::new(MemoryStorage::new()), Arc::new(directory));
            let orders = Arc::new(orders);
            let app = App {
                handle: provider.handle(),
                catalog: Arc::new(catalog),
                orders: orders.clone(),
            };
            Self {
                provider,
                orders,
                app,
            }
        }
    }
}
