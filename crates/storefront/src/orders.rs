//! Order history for the logged-in customer.

use thiserror::Error;
use tracing::{info, instrument};

use shop_smart_core::{Customer, Order, OrderId};

use crate::api::{ApiError, OrderApi};
use crate::context::{ContextError, StoreHandle};

/// Where to send a visitor who is not logged in.
pub const ORDERS_REDIRECT: &str = "/register?redirect=orders";

/// Errors from reading orders.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Please log in or register to see your orders")]
    NotAuthenticated,

    /// Missing, or placed by another customer.
    #[error("Order {0} not found")]
    NotFound(OrderId),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OrderError {
    /// Whether the error is an expected outcome the user can act on.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::NotFound(_) => true,
            Self::Api(ApiError::Status { status, .. }) => *status < 500,
            Self::Context(_) | Self::Api(_) => false,
        }
    }
}

fn current_customer(handle: &StoreHandle) -> Result<Customer, OrderError> {
    handle
        .session()?
        .customer()
        .ok_or(OrderError::NotAuthenticated)
}

/// Orders placed by the logged-in customer, as the backend lists them.
///
/// # Errors
///
/// `NotAuthenticated` if nobody is logged in, `Context` if the provider is
/// gone, `Api` if the backend call fails.
#[instrument(skip_all)]
pub async fn order_history(
    handle: &StoreHandle,
    orders: &dyn OrderApi,
) -> Result<Vec<Order>, OrderError> {
    let customer = current_customer(handle)?;
    let history = orders.customer_orders(customer.id).await?;
    info!(customer_id = %customer.id, count = history.len(), "Order history fetched");
    Ok(history)
}

/// One of the logged-in customer's orders.
///
/// Orders belonging to someone else are reported as not found.
///
/// # Errors
///
/// `NotAuthenticated` if nobody is logged in, `NotFound` if the order does
/// not exist or is not theirs, `Context` if the provider is gone, `Api` for
/// other backend failures.
#[instrument(skip(handle, orders))]
pub async fn order_details(
    handle: &StoreHandle,
    orders: &dyn OrderApi,
    id: OrderId,
) -> Result<Order, OrderError> {
    let customer = current_customer(handle)?;
    match orders.order(id).await {
        Ok(order) if order.customer_id == customer.id => Ok(order),
        Ok(_) | Err(ApiError::Status { status: 404, .. }) => Err(OrderError::NotFound(id)),
        Err(e) => Err(e.into()),
    }
}
