//! Catalog browsing.
//!
//! The backend filters; ordering is applied client side.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use shop_smart_core::{Product, ProductFilters};

use crate::api::{ApiError, ProductCatalog};

/// Sort orders offered by the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    /// Alphabetical, ignoring case.
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    /// Most recently created first.
    Newest,
}

impl ProductSort {
    /// Every sort, in the order they are offered.
    pub const ALL: [Self; 4] = [Self::Name, Self::PriceLow, Self::PriceHigh, Self::Newest];

    /// The name used on the command line and in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Newest => "newest",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Newest => b.created_at.cmp(&a.created_at),
        }
    }

    /// Sort in place. Ties keep their incoming order.
    pub fn apply(self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort '{0}' (expected name, price-low, price-high or newest)")]
pub struct ProductSortError(String);

impl FromStr for ProductSort {
    type Err = ProductSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProductSortError(s.to_string()))
    }
}

/// Fetch the products matching `filters`, sorted.
///
/// # Errors
///
/// Returns the catalog's error if the listing cannot be fetched.
#[instrument(skip(catalog))]
pub async fn browse(
    catalog: &dyn ProductCatalog,
    filters: &ProductFilters,
    sort: ProductSort,
) -> Result<Vec<Product>, ApiError> {
    let mut products = catalog.products(filters).await?;
    sort.apply(&mut products);
    debug!(count = products.len(), "Catalog listing fetched");
    Ok(products)
}
