//! Cart commands.

use shop_smart_core::{ProductId, format_money};
use shop_smart_storefront::{CartState, ProductCatalog, StorefrontError};

use super::{App, CommandResult};

fn print_cart(cart: &CartState) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.items() {
        println!(
            "{:>4}  {:<32} {:>3} x {:>9} = {:>10}",
            line.product_id().as_i32(),
            line.product().name,
            line.quantity(),
            format_money(line.product().price),
            format_money(line.line_total()),
        );
    }
    println!(
        "{} item(s), subtotal {}",
        cart.total_item_count(),
        format_money(cart.total_amount())
    );
}

/// `cart show`
pub fn show(app: &App) -> CommandResult {
    print_cart(&app.handle.cart()?.snapshot());
    Ok(())
}

/// `cart add <product-id> [-q N]`
pub async fn add(app: &App, product_id: ProductId, quantity: u32) -> CommandResult {
    if quantity == 0 {
        return Err(StorefrontError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }

    let product = app.catalog.product(product_id).await?;
    if !product.is_active {
        return Err(StorefrontError::InvalidInput(format!(
            "{} is no longer available",
            product.name
        )));
    }

    let cart = app.handle.cart()?;
    let wanted = u64::from(cart.item_quantity(product_id)) + u64::from(quantity);
    if !product.is_in_stock || wanted > u64::try_from(product.stock_quantity).unwrap_or(0) {
        tracing::warn!(
            product_id = %product_id,
            stock = product.stock_quantity,
            wanted,
            "Adding more than is in stock"
        );
    }

    cart.add_item(&product, quantity);
    println!("Added {quantity} x {} to your cart.", product.name);
    print_cart(&cart.snapshot());
    Ok(())
}

/// `cart set <product-id> <quantity>`
pub fn set(app: &App, product_id: ProductId, quantity: i64) -> CommandResult {
    let cart = app.handle.cart()?;
    if !cart.is_item_in_cart(product_id) {
        println!("Product {product_id} is not in your cart.");
        return Ok(());
    }

    cart.update_quantity(product_id, quantity);
    print_cart(&cart.snapshot());
    Ok(())
}

/// `cart remove <product-id>`
pub fn remove(app: &App, product_id: ProductId) -> CommandResult {
    let cart = app.handle.cart()?;
    cart.remove_item(product_id);
    print_cart(&cart.snapshot());
    Ok(())
}

/// `cart clear`
pub fn clear(app: &App) -> CommandResult {
    app.handle.cart()?.clear_cart();
    println!("Cart cleared.");
    Ok(())
}
