//! Checkout commands.

use shop_smart_core::{ShippingAddress, format_money};
use shop_smart_storefront::{CheckoutGate, OrderSummary, StorefrontError, place_order};

use super::{App, CommandResult, non_blank};
use crate::AddressArgs;

fn print_summary(summary: &OrderSummary) {
    println!("Items:     {}", summary.item_count);
    println!("Subtotal:  {}", format_money(summary.subtotal));
    if summary.has_free_shipping() {
        println!("Shipping:  FREE");
    } else {
        println!("Shipping:  {}", format_money(summary.shipping));
        println!(
            "           spend {} more for free shipping",
            format_money(summary.free_shipping_remaining)
        );
    }
    println!("Tax:       {}", format_money(summary.tax));
    println!("Total:     {}", format_money(summary.total));
}

/// Explain why checkout cannot proceed. Returns true if it can.
fn check_gate(app: &App) -> Result<bool, StorefrontError> {
    let (session, cart) = (app.handle.session()?, app.handle.cart()?);
    let gate = CheckoutGate::evaluate(&session, &cart);
    match gate {
        CheckoutGate::Ready => return Ok(true),
        CheckoutGate::RequiresLogin => {
            println!("Please log in or register to check out (shop-cli account --help).");
        }
        CheckoutGate::EmptyCart => println!("Your cart is empty."),
    }
    tracing::debug!(redirect = gate.redirect().unwrap_or_default(), "Checkout not ready");
    Ok(false)
}

/// `checkout summary`
pub fn summary(app: &App) -> CommandResult {
    if check_gate(app)? {
        print_summary(&OrderSummary::from_cart(&app.handle.cart()?.snapshot()));
    }
    Ok(())
}

/// `checkout place`
pub async fn place(app: &App, overrides: AddressArgs) -> CommandResult {
    if !check_gate(app)? {
        return Ok(());
    }

    let summary = OrderSummary::from_cart(&app.handle.cart()?.snapshot());
    let mut address = app
        .handle
        .session()?
        .customer()
        .map(|customer| ShippingAddress::from_customer(&customer))
        .unwrap_or_default();

    let apply = |field: &mut String, value: Option<String>| {
        if let Some(value) = non_blank(value) {
            *field = value;
        }
    };
    apply(&mut address.address, overrides.address);
    apply(&mut address.city, overrides.city);
    apply(&mut address.state, overrides.state);
    apply(&mut address.postal_code, overrides.postal_code);
    apply(&mut address.country, overrides.country);

    let order = place_order(&app.handle, app.orders.as_ref(), address).await?;

    println!(
        "Order {} placed (id {}). Thank you!",
        order.order_number, order.id
    );
    println!("Status:    {}", order.status);
    print_summary(&summary);
    if order.total_amount != summary.total {
        println!("Charged:   {}", format_money(order.total_amount));
    }
    Ok(())
}
