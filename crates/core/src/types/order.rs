//! Order records and the checkout request payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Customer, CustomerId, Money, OrderId, OrderItemId, OrderStatus, ProductId};

/// Country used when the customer record has none.
pub const DEFAULT_COUNTRY: &str = "United States";

/// One product/quantity pair submitted with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Shipping destination for an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Pre-fill from the customer's saved address.
    #[must_use]
    pub fn from_customer(customer: &Customer) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            address: field(&customer.address),
            city: field(&customer.city),
            state: field(&customer.state),
            postal_code: field(&customer.postal_code),
            country: customer
                .country
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        }
    }

    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Payload for `POST /order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub cart_items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// An order as returned by the backend after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    #[serde(with = "super::timestamp")]
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    pub total_amount: Money,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
