//! End-to-end checkout: register, fill the cart, review, place the order,
//! and find it in the order history.

use rust_decimal::Decimal;

use shop_smart_core::{CustomerUpdate, DEFAULT_COUNTRY, OrderStatus, ShippingAddress};
use shop_smart_integration_tests::TestEnv;
use shop_smart_storefront::storage::CART_KEY;
use shop_smart_storefront::testing::{RecordingOrders, new_customer, product};
use shop_smart_storefront::{
    ApiError, CheckoutGate, OrderError, OrderSummary, order_details, order_history, place_order,
};

#[tokio::test]
async fn test_register_shop_and_place_order() {
    let env = TestEnv::new();
    let provider = env.provider();
    let (session, cart) = (provider.session(), provider.cart());
    let mug = product(1, "Mug", 1250);
    let kettle = product(2, "Kettle", 4000);
    let orders = RecordingOrders::priced_from([mug.clone(), kettle.clone()]);

    cart.add_item(&mug, 2);
    assert_eq!(
        CheckoutGate::evaluate(&session, &cart),
        CheckoutGate::RequiresLogin
    );

    let customer = session
        .register(&new_customer("grace@example.com"))
        .await
        .expect("registration succeeds");
    let customer = session
        .update_profile(&CustomerUpdate {
            address: Some("12 Harbour Rd".to_string()),
            city: Some("Portland".to_string()),
            state: Some("ME".to_string()),
            postal_code: Some("04101".to_string()),
            ..CustomerUpdate::default()
        })
        .await
        .expect("profile update succeeds");
    assert_eq!(CheckoutGate::evaluate(&session, &cart), CheckoutGate::Ready);

    cart.add_item(&kettle, 1);
    let summary = OrderSummary::from_cart(&cart.snapshot());
    assert_eq!(summary.subtotal, Decimal::new(6500, 2));
    assert!(summary.has_free_shipping());
    assert_eq!(summary.tax, Decimal::new(520, 2));
    assert_eq!(summary.total, Decimal::new(7020, 2));

    let address = ShippingAddress::from_customer(&customer);
    assert_eq!(address.country, DEFAULT_COUNTRY);

    let order = place_order(&provider.handle(), &orders, address)
        .await
        .expect("order placed");

    assert_eq!(order.customer_id, customer.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, summary.subtotal);
    assert!(cart.is_empty());

    let submitted = orders.requests();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted.first().map(|r| r.shipping_address.city.as_str()),
        Some("Portland")
    );

    let handle = provider.handle();
    let history = order_history(&handle, &orders).await.expect("history");
    assert_eq!(history, vec![order.clone()]);
    let details = order_details(&handle, &orders, order.id)
        .await
        .expect("details");
    assert_eq!(details.order_items.len(), 2);

    session.logout();
    assert!(matches!(
        order_history(&handle, &orders).await,
        Err(OrderError::NotAuthenticated)
    ));

    provider.shutdown().await;
    let stored = std::fs::read_to_string(env.entry_path(CART_KEY)).expect("cart entry written");
    assert_eq!(stored, "[]");
}

#[tokio::test]
async fn test_rejected_order_keeps_cart_on_disk() {
    let env = TestEnv::new();
    let provider = env.provider();
    let orders = RecordingOrders::default();
    orders.fail_next(ApiError::Status {
        status: 503,
        message: "Service Unavailable".to_string(),
    });

    provider
        .session()
        .register(&new_customer("grace@example.com"))
        .await
        .expect("registration succeeds");
    provider.cart().add_item(&product(1, "Mug", 1250), 2);

    let address = ShippingAddress {
        address: "12 Harbour Rd".to_string(),
        city: "Portland".to_string(),
        state: "ME".to_string(),
        postal_code: "04101".to_string(),
        country: DEFAULT_COUNTRY.to_string(),
    };
    let err = place_order(&provider.handle(), &orders, address)
        .await
        .expect_err("backend rejects");
    assert!(!err.is_user_facing());
    provider.shutdown().await;

    let restarted = env.provider();
    assert_eq!(restarted.cart().total_item_count(), 2);
}
