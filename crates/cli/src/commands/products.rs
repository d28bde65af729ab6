//! Catalog commands.

use shop_smart_core::{Product, ProductFilters, ProductId, format_money};
use shop_smart_storefront::{ProductCatalog, StorefrontError, browse};

use super::{App, CommandResult, non_blank};
use crate::ListArgs;

fn print_product(product: &Product) {
    let stock = if product.is_in_stock {
        format!("{} in stock", product.stock_quantity)
    } else {
        "out of stock".to_string()
    };
    println!(
        "{:>4}  {:<32} {:>9}  {}",
        product.id.as_i32(),
        product.name,
        format_money(product.price),
        stock
    );
}

/// `products list`
pub async fn list(app: &App, args: ListArgs) -> CommandResult {
    if matches!((args.min_price, args.max_price), (Some(min), Some(max)) if min > max) {
        return Err(StorefrontError::InvalidInput(
            "--min-price is above --max-price".to_string(),
        ));
    }

    let filters = ProductFilters {
        category_id: args.category,
        search_term: non_blank(args.search),
        min_price: args.min_price,
        max_price: args.max_price,
        in_stock_only: args.in_stock,
    };
    let products = browse(app.catalog.as_ref(), &filters, args.sort).await?;

    if products.is_empty() {
        println!("No products match.");
        return Ok(());
    }
    for product in &products {
        print_product(product);
    }
    println!("{} product(s), sorted by {}", products.len(), args.sort);
    Ok(())
}

/// `products show <product-id>`
pub async fn show(app: &App, id: ProductId) -> CommandResult {
    let product = app.catalog.product(id).await?;
    print_product(&product);
    if let Some(description) = &product.description {
        println!("      {description}");
    }
    if let Some(sku) = &product.sku {
        println!("      SKU {sku}");
    }

    let in_cart = app.handle.cart()?.item_quantity(id);
    if in_cart > 0 {
        println!("      {in_cart} in your cart");
    }
    Ok(())
}

/// `products categories`
pub async fn categories(app: &App) -> CommandResult {
    let categories = app.catalog.categories().await?;
    if categories.is_empty() {
        println!("No categories.");
    }
    for category in &categories {
        match &category.description {
            Some(description) => println!(
                "{:>4}  {:<24} {description}",
                category.id.as_i32(),
                category.name
            ),
            None => println!("{:>4}  {}", category.id.as_i32(), category.name),
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shop_smart_core::Money;
    use shop_smart_storefront::testing::{
        InMemoryDirectory, RecordingOrders, StaticCatalog, category, product,
    };

    use super::*;
    use crate::commands::test_support::TestApp;

    fn test_app() -> TestApp {
        TestApp::new(
            InMemoryDirectory::default(),
            StaticCatalog::new([product(1, "Mug", 1250), product(2, "Beans", 1450)])
                .with_categories([category(1, "Kitchen")]),
            RecordingOrders::default(),
        )
    }

    #[tokio::test]
    async fn test_list_show_and_categories() {
        let t = test_app();
        t.provider.cart().add_item(&product(1, "Mug", 1250), 2);

        list(&t.app, ListArgs::default()).await.unwrap();
        show(&t.app, ProductId::new(1)).await.unwrap();
        categories(&t.app).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_price_range() {
        let t = test_app();
        let args = ListArgs {
            min_price: Some(Money::from(20)),
            max_price: Some(Money::from(10)),
            ..ListArgs::default()
        };

        let err = list(&t.app, args).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_show_unknown_product() {
        let err = show(&test_app().app, ProductId::new(9)).await.unwrap_err();
        assert_eq!(err.to_string(), "Product not found");
    }
}
