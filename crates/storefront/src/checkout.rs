//! Checkout: gating, order summary, and order submission.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shop_smart_core::{
    CartItem, CreateOrderRequest, Money, Order, ShippingAddress, round_cents,
};

use crate::api::{ApiError, OrderApi};
use crate::cart::{CartState, CartStore};
use crate::context::{ContextError, StoreHandle};
use crate::error::add_breadcrumb;
use crate::session::SessionStore;

/// Subtotal at which shipping becomes free.
pub const FREE_SHIPPING_THRESHOLD: Money = Decimal::from_parts(5000, 0, 0, false, 2);

/// Flat shipping charge below the threshold.
pub const FLAT_SHIPPING: Money = Decimal::from_parts(999, 0, 0, false, 2);

/// Sales tax rate applied to the subtotal.
pub const TAX_RATE: Money = Decimal::from_parts(8, 0, 0, false, 2);

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please log in or register to check out")]
    NotAuthenticated,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Shipping address is incomplete: missing {}", .0.join(", "))]
    IncompleteAddress(Vec<&'static str>),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CheckoutError {
    /// Whether the error is an expected outcome the user can act on.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::EmptyCart | Self::IncompleteAddress(_) => true,
            Self::Api(ApiError::Status { status, .. }) => *status < 500,
            Self::Context(_) | Self::Api(_) => false,
        }
    }
}

/// Where a visitor to the checkout page should end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutGate {
    Ready,
    /// Nobody is logged in; send them to registration.
    RequiresLogin,
    /// Nothing to buy; send them back to the cart.
    EmptyCart,
}

impl CheckoutGate {
    /// Authentication is checked before the cart.
    #[must_use]
    pub fn evaluate(session: &SessionStore, cart: &CartStore) -> Self {
        if !session.is_authenticated() {
            Self::RequiresLogin
        } else if cart.is_empty() {
            Self::EmptyCart
        } else {
            Self::Ready
        }
    }

    /// Route to redirect to, if checkout cannot proceed.
    #[must_use]
    pub const fn redirect(self) -> Option<&'static str> {
        match self {
            Self::Ready => None,
            Self::RequiresLogin => Some("/register?redirect=checkout"),
            Self::EmptyCart => Some("/cart"),
        }
    }
}

/// Price breakdown shown before an order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub item_count: u64,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    /// How much more to spend for free shipping; zero once reached.
    pub free_shipping_remaining: Money,
}

impl OrderSummary {
    #[must_use]
    pub fn from_cart(cart: &CartState) -> Self {
        let subtotal = cart.total_amount();
        let shipping = if subtotal >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let tax = round_cents(subtotal * TAX_RATE);

        Self {
            item_count: cart.total_item_count(),
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            free_shipping_remaining: (FREE_SHIPPING_THRESHOLD - subtotal).max(Decimal::ZERO),
        }
    }

    /// Whether shipping is free.
    #[must_use]
    pub fn has_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Submit the cart as an order for the logged-in customer.
///
/// On success the cart is cleared and the created order returned. On any
/// failure the cart is left as it was.
///
/// # Errors
///
/// `NotAuthenticated` or `EmptyCart` if the gate is not ready,
/// `IncompleteAddress` if a required address field is blank, `Context` if the
/// provider is gone, `Api` if the backend rejects the order.
#[instrument(skip_all)]
pub async fn place_order(
    handle: &StoreHandle,
    orders: &dyn OrderApi,
    address: ShippingAddress,
) -> Result<Order, CheckoutError> {
    let session = handle.session()?;
    let cart = handle.cart()?;

    let customer = session.customer().ok_or(CheckoutError::NotAuthenticated)?;
    let lines = cart.items();
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let missing = address.missing_fields();
    if !missing.is_empty() {
        return Err(CheckoutError::IncompleteAddress(missing));
    }

    let request = CreateOrderRequest {
        customer_id: customer.id,
        cart_items: lines
            .iter()
            .map(|line| CartItem {
                product_id: line.product_id(),
                quantity: line.quantity(),
            })
            .collect(),
        shipping_address: address,
    };

    let customer_id = customer.id.to_string();
    add_breadcrumb(
        "checkout",
        "Placing order",
        &[("customer_id", customer_id.as_str())],
    );

    match orders.create_order(&request).await {
        Ok(order) => {
            cart.clear_cart();
            info!(
                order_id = %order.id,
                order_number = %order.order_number,
                total = %order.total_amount,
                "Order placed"
            );
            Ok(order)
        }
        Err(e) => {
            warn!(error = %e, "Order submission failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use shop_smart_core::DEFAULT_COUNTRY;

    use super::*;
    use crate::context::StoreProvider;
    use crate::storage::MemoryStorage;
    use crate::testing::{InMemoryDirectory, RecordingOrders, customer, product};

    fn provider_with_customer() -> StoreProvider {
        let directory = InMemoryDirectory::with_customers(vec![customer(1, "a@x.com")]);
        StoreProvider::new(Arc::new(MemoryStorage::new()), Arc::new(directory))
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    fn summary_for(price_cents: i64, quantity: u32) -> OrderSummary {
        let mut state = CartState::default();
        if quantity > 0 {
            let line = serde_json::json!({
                "quantity": quantity,
                "product": product(1, "Item", price_cents),
            });
            state = CartState::from_items(vec![serde_json::from_value(line).unwrap()]);
        }
        OrderSummary::from_cart(&state)
    }

    #[tokio::test]
    async fn test_gate_checks_login_before_cart() {
        let provider = provider_with_customer();
        let (session, cart) = (provider.session(), provider.cart());

        assert_eq!(CheckoutGate::evaluate(&session, &cart), CheckoutGate::RequiresLogin);
        assert_eq!(
            CheckoutGate::RequiresLogin.redirect(),
            Some("/register?redirect=checkout")
        );

        session.login("a@x.com").await.unwrap();
        assert_eq!(CheckoutGate::evaluate(&session, &cart), CheckoutGate::EmptyCart);
        assert_eq!(CheckoutGate::EmptyCart.redirect(), Some("/cart"));

        cart.add_item(&product(1, "Mug", 999), 1);
        assert_eq!(CheckoutGate::evaluate(&session, &cart), CheckoutGate::Ready);
        assert_eq!(CheckoutGate::Ready.redirect(), None);
    }

    #[test]
    fn test_summary_below_threshold() {
        let summary = summary_for(1999, 2);
        assert_eq!(summary.subtotal, Decimal::new(3998, 2));
        assert_eq!(summary.shipping, FLAT_SHIPPING);
        assert_eq!(summary.tax, Decimal::new(320, 2));
        assert_eq!(summary.total, Decimal::new(5317, 2));
        assert_eq!(summary.free_shipping_remaining, Decimal::new(1002, 2));
        assert!(!summary.has_free_shipping());
    }

    #[test]
    fn test_summary_at_threshold_ships_free() {
        let summary = summary_for(2500, 2);
        assert!(summary.has_free_shipping());
        assert_eq!(summary.tax, Decimal::new(400, 2));
        assert_eq!(summary.total, Decimal::new(5400, 2));
        assert_eq!(summary.free_shipping_remaining, Decimal::ZERO);
    }

    #[test]
    fn test_summary_empty_cart() {
        let summary = summary_for(0, 0);
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.tax, Decimal::ZERO);
        assert_eq!(summary.free_shipping_remaining, FREE_SHIPPING_THRESHOLD);
    }

    #[tokio::test]
    async fn test_place_order_clears_cart() {
        let provider = provider_with_customer();
        provider.session().login("a@x.com").await.unwrap();
        provider.cart().add_item(&product(1, "Mug", 999), 2);
        provider.cart().add_item(&product(2, "Beans", 1450), 1);
        let orders = RecordingOrders::default();

        let order = place_order(&provider.handle(), &orders, address()).await.unwrap();

        assert!(provider.cart().is_empty());
        let submitted = orders.requests();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].customer_id, order.customer_id);
        let quantities: Vec<u32> = submitted[0].cart_items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_place_order_failure_keeps_cart() {
        let provider = provider_with_customer();
        provider.session().login("a@x.com").await.unwrap();
        provider.cart().add_item(&product(1, "Mug", 999), 2);
        let orders = RecordingOrders::default();
        orders.fail_next(ApiError::Status {
            status: 400,
            message: "Insufficient stock".to_string(),
        });

        let err = place_order(&provider.handle(), &orders, address()).await.unwrap_err();

        assert_eq!(err.to_string(), "Insufficient stock");
        assert!(err.is_user_facing());
        assert_eq!(provider.cart().total_item_count(), 2);
    }

    #[tokio::test]
    async fn test_place_order_rejects_before_submitting() {
        let provider = provider_with_customer();
        let orders = RecordingOrders::default();
        let handle = provider.handle();

        let err = place_order(&handle, &orders, address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotAuthenticated));

        provider.session().login("a@x.com").await.unwrap();
        let err = place_order(&handle, &orders, address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        provider.cart().add_item(&product(1, "Mug", 999), 1);
        let partial = ShippingAddress {
            city: String::new(),
            ..address()
        };
        let err = place_order(&handle, &orders, partial).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Shipping address is incomplete: missing city"
        );

        assert!(orders.requests().is_empty());
        assert_eq!(provider.cart().total_item_count(), 1);
    }

    #[tokio::test]
    async fn test_place_order_outside_provider() {
        let handle = provider_with_customer().handle();
        let err = place_order(&handle, &RecordingOrders::default(), address())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Context(_)));
    }
}
