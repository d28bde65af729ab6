//! Catalog product records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, Money, ProductId};

/// A catalog product as returned by `GET /product/{id}`.
///
/// Cart line items hold a full copy of this record taken when the product was
/// added, so it must survive a round trip through local storage unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub is_in_stock: bool,
}

const fn default_true() -> bool {
    true
}

/// Query for `GET /product`.
///
/// Unset fields are left out of the query string. The backend applies the
/// same rules as [`ProductFilters::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Money>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_stock_only: bool,
}

impl ProductFilters {
    /// Whether `product` passes every filter that is set.
    ///
    /// The search term matches name, description or SKU, ignoring case.
    /// Price bounds are inclusive.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.category_id.is_some_and(|id| id != product.category_id) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min)
            || self.max_price.is_some_and(|max| product.price > max)
        {
            return false;
        }
        if self.in_stock_only && !product.is_in_stock {
            return false;
        }

        let Some(term) = self
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();
        [
            Some(product.name.as_str()),
            product.description.as_deref(),
            product.sku.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}
