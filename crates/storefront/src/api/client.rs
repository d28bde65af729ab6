//! HTTP client for the ShopSmart REST backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use shop_smart_core::{
    Category, CreateOrderRequest, Customer, CustomerId, CustomerUpdate, NewCustomer, Order,
    OrderId, Product, ProductFilters, ProductId,
};

use super::{ApiError, CustomerDirectory, OrderApi, ProductCatalog};
use crate::config::StorefrontConfig;

/// Fallback when an error response carries no usable message.
const GENERIC_ERROR: &str = "An error occurred";

/// REST client for the customer, product and order endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpApiClient {
    inner: Arc<HttpApiClientInner>,
}

struct HttpApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Client` if the token is not a valid header value or
    /// the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Client(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Client(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(HttpApiClientInner {
                client,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response was received");
            ApiError::Network(e)
        })?;

        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Turn a non-success response into `ApiError::Status`.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(status = status.as_u16(), %message, "API error");

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Extract the user-facing message from an error body.
///
/// Prefers a JSON `message` field, then a bare JSON string, then the raw
/// body text.
fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_ERROR.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map_or_else(|| trimmed.to_string(), str::to_string),
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        _ => trimmed.to_string(),
    }
}

#[async_trait]
impl CustomerDirectory for HttpApiClient {
    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> Result<Vec<Customer>, ApiError> {
        debug!("Searching customers");
        let request = self
            .inner
            .client
            .get(self.url("/customer/search"))
            .query(&[("term", term)]);
        self.send_json(request).await
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create(&self, customer: &NewCustomer) -> Result<Customer, ApiError> {
        debug!("Creating customer");
        let request = self.inner.client.post(self.url("/customer")).json(customer);
        self.send_json(request).await
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: CustomerId, update: &CustomerUpdate) -> Result<Customer, ApiError> {
        debug!("Updating customer");
        let request = self
            .inner
            .client
            .put(self.url(&format!("/customer/{id}")))
            .json(update);
        self.send_json(request).await
    }
}

#[async_trait]
impl ProductCatalog for HttpApiClient {
    #[instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let request = self.inner.client.get(self.url(&format!("/product/{id}")));
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn products(&self, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        let request = self.inner.client.get(self.url("/product")).query(filters);
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let request = self.inner.client.get(self.url("/category"));
        self.send_json(request).await
    }
}

#[async_trait]
impl OrderApi for HttpApiClient {
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, lines = request.cart_items.len()))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        debug!("Submitting order");
        let builder = self.inner.client.post(self.url("/order")).json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("/order/customer/{customer_id}")));
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        let request = self.inner.client.get(self.url(&format!("/order/{id}")));
        self.send_json(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"message":"Email already registered","code":409}"#),
            "Email already registered"
        );
    }

    #[test]
    fn test_error_message_plain_text_and_json_string() {
        assert_eq!(error_message("Customer not found"), "Customer not found");
        assert_eq!(error_message(r#""Out of stock""#), "Out of stock");
    }

    #[test]
    fn test_error_message_object_without_message_uses_body() {
        let body = r#"{"title":"Bad Request","status":400}"#;
        assert_eq!(error_message(body), body);
    }

    #[test]
    fn test_error_message_empty_body() {
        assert_eq!(error_message(""), GENERIC_ERROR);
        assert_eq!(error_message("  \n"), GENERIC_ERROR);
    }

    #[test]
    fn test_client_trims_base_url() {
        let mut config = StorefrontConfig::for_tests();
        config.api_base_url = "http://localhost:5000/api/".parse().unwrap();

        let client = HttpApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(
            client.url("/customer/search"),
            "http://localhost:5000/api/customer/search"
        );
    }
}
