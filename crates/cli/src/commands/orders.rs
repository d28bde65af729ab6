//! Order history commands.

use shop_smart_core::{Order, OrderId, format_money};
use shop_smart_storefront::{order_details, order_history};

use super::{App, CommandResult};

fn print_order_line(order: &Order) {
    println!(
        "{:>6}  {:<20} {}  {:<10} {:>10}",
        order.id.as_i32(),
        order.order_number,
        order.order_date.format("%Y-%m-%d"),
        order.status.label(),
        format_money(order.total_amount),
    );
}

/// `account orders`
pub async fn history(app: &App) -> CommandResult {
    let orders = order_history(&app.handle, app.orders.as_ref()).await?;
    if orders.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }

    for order in &orders {
        print_order_line(order);
    }
    println!("{} order(s)", orders.len());
    Ok(())
}

/// `order show <order-id>`
pub async fn show(app: &App, id: OrderId) -> CommandResult {
    let order = order_details(&app.handle, app.orders.as_ref(), id).await?;

    print_order_line(&order);
    for item in &order.order_items {
        println!(
            "        product {:>4}  {:>3} x {:>9} = {:>10}",
            item.product_id.as_i32(),
            item.quantity,
            format_money(item.unit_price),
            format_money(item.total_price),
        );
    }
    if let Some(notes) = order.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        println!("        Notes: {notes}");
    }
    Ok(())
}
