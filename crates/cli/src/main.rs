//! ShopSmart CLI - storefront client for the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two units of product 3 to the cart
//! shop-cli cart add 3 -q 2
//!
//! # Browse in-stock coffee, cheapest first
//! shop-cli products list --category 2 --in-stock --sort price-low
//!
//! # Log in and review the order
//! shop-cli account login ada@example.com
//! shop-cli checkout summary
//!
//! # Place the order, overriding the saved city
//! shop-cli checkout place --city Springfield
//!
//! # Look back at it
//! shop-cli account orders
//! shop-cli order show 42
//! ```
//!
//! # Commands
//!
//! - `products` - Browse the catalog and categories
//! - `cart` - Show and change the cart
//! - `account` - Log in, register, update the profile, list orders, log out
//! - `checkout` - Review totals and place the order
//! - `order` - Show one of your orders
//!
//! The cart and session live in `SHOP_DATA_DIR` between runs. See
//! [`shop_smart_storefront::config`] for the other environment variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_smart_core::{CategoryId, Money, OrderId, ProductId};
use shop_smart_storefront::{
    FileStorage, HttpApiClient, ProductSort, StoreProvider, StorefrontConfig, StorefrontError,
};

mod commands;

use commands::App;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "ShopSmart storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the customer session
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Review and place the order
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Look up a past order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered
    List(ListArgs),
    /// Show one product
    Show { product_id: ProductId },
    /// List categories
    Categories,
}

/// Catalog filters and ordering.
#[derive(Args, Default)]
pub struct ListArgs {
    /// Only this category id
    #[arg(long)]
    pub category: Option<CategoryId>,
    /// Match name, description or SKU
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub min_price: Option<Money>,
    #[arg(long)]
    pub max_price: Option<Money>,
    /// Hide products that are out of stock
    #[arg(long)]
    pub in_stock: bool,
    /// name, price-low, price-high or newest
    #[arg(long, default_value_t)]
    pub sort: ProductSort,
}

#[derive(Subcommand)]
enum CartAction {
    /// List the cart lines and totals
    Show,
    /// Add a product by id
    Add {
        product_id: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 or less removes it)
    Set {
        product_id: ProductId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { product_id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Log in with an email address
    Login { email: String },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Change profile fields
    Update(ProfileArgs),
    /// List your orders
    Orders,
    /// Log out
    Logout,
    /// Show the logged-in customer
    Show,
}

/// Profile fields; only the ones given are sent.
#[derive(Args, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[command(flatten)]
    pub address: AddressArgs,
}

/// Address overrides.
#[derive(Args, Default)]
pub struct AddressArgs {
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Show the order summary
    Summary,
    /// Place the order, shipping to the saved address unless overridden
    Place(AddressArgs),
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show an order and its lines
    Show { order_id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shop_smart_storefront=info,shop_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);
    init_tracing();
    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let api = Arc::new(HttpApiClient::new(&config).map_err(StorefrontError::from)?);
    let storage = Arc::new(FileStorage::new(&config.data_dir));
    tracing::debug!(data_dir = %config.data_dir.display(), api = api.base_url(), "Starting");

    let provider = StoreProvider::new(storage, api.clone());
    let app = App {
        handle: provider.handle(),
        catalog: api.clone(),
        orders: api,
    };

    let result = match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List(args) => commands::products::list(&app, args).await,
            ProductsAction::Show { product_id } => {
                commands::products::show(&app, product_id).await
            }
            ProductsAction::Categories => commands::products::categories(&app).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app),
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&app, product_id, quantity).await,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&app, product_id, quantity),
            CartAction::Remove { product_id } => commands::cart::remove(&app, product_id),
            CartAction::Clear => commands::cart::clear(&app),
        },
        Commands::Account { action } => match action {
            AccountAction::Login { email } => commands::account::login(&app, &email).await,
            AccountAction::Register {
                email,
                first_name,
                last_name,
                phone,
            } => {
                commands::account::register(&app, &email, first_name, last_name, phone).await
            }
            AccountAction::Update(profile) => commands::account::update(&app, profile).await,
            AccountAction::Orders => commands::orders::history(&app).await,
            AccountAction::Logout => commands::account::logout(&app),
            AccountAction::Show => commands::account::show(&app),
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Summary => commands::checkout::summary(&app),
            CheckoutAction::Place(address) => commands::checkout::place(&app, address).await,
        },
        Commands::Order { action } => match action {
            OrderAction::Show { order_id } => commands::orders::show(&app, order_id).await,
        },
    };

    // Persist whatever changed, even if the command failed part way.
    provider.shutdown().await;

    result.map_err(|e| {
        e.report();
        e.into()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_set_negative() {
        let cli = Cli::try_parse_from(["shop-cli", "cart", "set", "3", "-1"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Cart {
                action: CartAction::Set { quantity: -1, .. }
            })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_product_id() {
        assert!(Cli::try_parse_from(["shop-cli", "cart", "add", "mug"]).is_err());
    }

    #[test]
    fn test_parse_products_list_filters() {
        let cli = Cli::try_parse_from([
            "shop-cli",
            "products",
            "list",
            "--category",
            "2",
            "--in-stock",
            "--max-price",
            "19.99",
            "--sort",
            "price-high",
        ])
        .unwrap();

        let Commands::Products {
            action: ProductsAction::List(args),
        } = cli.command
        else {
            panic!("expected products list");
        };
        assert_eq!(args.category, Some(CategoryId::new(2)));
        assert!(args.in_stock);
        assert_eq!(args.max_price, Some(Money::new(1999, 2)));
        assert_eq!(args.sort, ProductSort::PriceHigh);
    }

    #[test]
    fn test_parse_defaults_sort_and_rejects_unknown() {
        let cli = Cli::try_parse_from(["shop-cli", "products", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Products {
                action: ProductsAction::List(ListArgs {
                    sort: ProductSort::Name,
                    ..
                })
            }
        ));
        assert!(Cli::try_parse_from(["shop-cli", "products", "list", "--sort", "cheap"]).is_err());
    }

    #[test]
    fn test_parse_order_show() {
        let cli = Cli::try_parse_from(["shop-cli", "order", "show", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Order {
                action: OrderAction::Show { order_id }
            } if order_id == OrderId::new(42)
        ));
    }
}
