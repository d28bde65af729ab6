//! Backend REST API seams.
//!
//! The stores and checkout depend on these traits rather than on HTTP, so
//! they can run against [`HttpApiClient`] in production and in-memory fakes
//! in tests.

mod client;

use async_trait::async_trait;
use thiserror::Error;

use shop_smart_core::{
    Category, CreateOrderRequest, Customer, CustomerId, CustomerUpdate, NewCustomer, Order,
    OrderId, Product, ProductFilters, ProductId,
};

pub use client::HttpApiClient;

/// Errors returned by the backend API.
///
/// `Display` is the user-facing message: the session store mirrors it into
/// its `error` field verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request never got a response.
    #[error("Network error. Please check your connection.")]
    Network(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// The client could not be built or the request could not be formed.
    #[error("{0}")]
    Client(String),
}

impl ApiError {
    /// HTTP status, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Customer directory endpoints used by the session store.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `GET /customer/search?term=` - free-text customer search.
    async fn search(&self, term: &str) -> Result<Vec<Customer>, ApiError>;

    /// `POST /customer` - create a customer.
    async fn create(&self, customer: &NewCustomer) -> Result<Customer, ApiError>;

    /// `PUT /customer/{id}` - apply a partial update.
    async fn update(&self, id: CustomerId, update: &CustomerUpdate) -> Result<Customer, ApiError>;
}

/// Catalog endpoints used for browsing and when adding to the cart by id.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// `GET /product/{id}`.
    async fn product(&self, id: ProductId) -> Result<Product, ApiError>;

    /// `GET /product` with the filters as query parameters.
    async fn products(&self, filters: &ProductFilters) -> Result<Vec<Product>, ApiError>;

    /// `GET /category`.
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;
}

/// Order endpoints used by checkout and order history.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// `POST /order`.
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError>;

    /// `GET /order/customer/{customerId}`.
    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, ApiError>;

    /// `GET /order/{id}`.
    async fn order(&self, id: OrderId) -> Result<Order, ApiError>;
}
