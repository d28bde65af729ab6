//! Fixtures and in-memory API fakes.
//!
//! Available to this crate's unit tests and, with the `testing` feature, to
//! other crates' tests.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use shop_smart_core::{
    Category, CategoryId, CreateOrderRequest, Customer, CustomerId, CustomerUpdate, Email,
    NewCustomer, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Product, ProductFilters,
    ProductId,
};

use crate::api::{ApiError, CustomerDirectory, OrderApi, ProductCatalog};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

/// An active, in-stock product priced in cents.
#[must_use]
pub fn product(id: i32, name: &str, price_cents: i64) -> Product {
    let created = Utc
        .with_ymd_and_hms(2024, 1, 5, 9, 30, 0)
        .single()
        .expect("valid fixture date");
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: None,
        price: Decimal::new(price_cents, 2),
        sku: Some(format!("SKU-{id:04}")),
        stock_quantity: 25,
        image_url: None,
        is_active: true,
        created_at: created,
        updated_at: created,
        category_id: CategoryId::new(1),
        is_in_stock: true,
    }
}

/// A catalog category.
#[must_use]
pub fn category(id: i32, name: &str) -> Category {
    let created = Utc
        .with_ymd_and_hms(2023, 12, 1, 0, 0, 0)
        .single()
        .expect("valid fixture date");
    Category {
        id: CategoryId::new(id),
        name: name.to_string(),
        description: None,
        created_at: created,
        updated_at: created,
    }
}

/// A customer with only the required fields set.
#[must_use]
pub fn customer(id: i32, email: &str) -> Customer {
    Customer {
        id: CustomerId::new(id),
        first_name: "Test".to_string(),
        last_name: format!("Customer{id}"),
        email: Email::parse(email).expect("valid fixture email"),
        phone_number: None,
        address: None,
        city: None,
        state: None,
        postal_code: None,
        country: None,
        created_at: Utc
            .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
            .single()
            .expect("valid fixture date"),
        full_name: format!("Test Customer{id}"),
    }
}

/// A registration payload.
#[must_use]
pub fn new_customer(email: &str) -> NewCustomer {
    NewCustomer {
        first_name: "New".to_string(),
        last_name: "Shopper".to_string(),
        email: Email::parse(email).expect("valid fixture email"),
        phone_number: None,
        address: None,
        city: None,
        state: None,
        postal_code: None,
        country: None,
    }
}

// =============================================================================
// Customer directory
// =============================================================================

/// In-memory customer directory.
///
/// `search` is deliberately loose, like the backend's free-text search: a
/// record matches if its email or name contains the term, or the part of the
/// term before `@`.
#[derive(Default)]
pub struct InMemoryDirectory {
    customers: Mutex<Vec<Customer>>,
    next_failure: Mutex<Option<ApiError>>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn with_customers(customers: Vec<Customer>) -> Self {
        Self {
            customers: Mutex::new(customers),
            next_failure: Mutex::new(None),
        }
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        *lock(&self.next_failure) = Some(error);
    }

    /// Current records.
    #[must_use]
    pub fn customers(&self) -> Vec<Customer> {
        lock(&self.customers).clone()
    }

    fn take_failure(&self) -> Result<(), ApiError> {
        lock(&self.next_failure).take().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryDirectory {
    async fn search(&self, term: &str) -> Result<Vec<Customer>, ApiError> {
        self.take_failure()?;
        let term = term.trim().to_lowercase();
        let local = term.split('@').next().unwrap_or_default().to_string();
        if local.is_empty() {
            return Ok(Vec::new());
        }

        Ok(lock(&self.customers)
            .iter()
            .filter(|c| {
                let email = c.email.as_str().to_lowercase();
                email.contains(&term)
                    || email.contains(&local)
                    || c.first_name.to_lowercase().contains(&term)
                    || c.last_name.to_lowercase().contains(&term)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, new: &NewCustomer) -> Result<Customer, ApiError> {
        self.take_failure()?;
        let mut customers = lock(&self.customers);
        if customers
            .iter()
            .any(|c| c.email.matches_ignore_case(new.email.as_str()))
        {
            return Err(ApiError::Status {
                status: 409,
                message: "Email already registered".to_string(),
            });
        }

        let id = customers.iter().map(|c| c.id.as_i32()).max().unwrap_or(0) + 1;
        let created = Customer {
            id: CustomerId::new(id),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            phone_number: new.phone_number.clone(),
            address: new.address.clone(),
            city: new.city.clone(),
            state: new.state.clone(),
            postal_code: new.postal_code.clone(),
            country: new.country.clone(),
            created_at: Utc::now(),
            full_name: format!("{} {}", new.first_name, new.last_name),
        };
        customers.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: CustomerId, update: &CustomerUpdate) -> Result<Customer, ApiError> {
        self.take_failure()?;
        let mut customers = lock(&self.customers);
        let customer = customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Customer"))?;

        let replace = |field: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                field.clone_from(value);
            }
        };
        replace(&mut customer.first_name, &update.first_name);
        replace(&mut customer.last_name, &update.last_name);
        if let Some(email) = &update.email {
            customer.email = email.clone();
        }

        let merge = |field: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                field.clone_from(value);
            }
        };
        merge(&mut customer.phone_number, &update.phone_number);
        merge(&mut customer.address, &update.address);
        merge(&mut customer.city, &update.city);
        merge(&mut customer.state, &update.state);
        merge(&mut customer.postal_code, &update.postal_code);
        merge(&mut customer.country, &update.country);
        customer.full_name = format!("{} {}", customer.first_name, customer.last_name);

        Ok(customer.clone())
    }
}

// =============================================================================
// Catalog and orders
// =============================================================================

/// Fixed product catalog.
///
/// `products` returns active products passing the filters, ordered by id.
#[derive(Default)]
pub struct StaticCatalog {
    products: HashMap<ProductId, Product>,
    categories: Vec<Category>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }
}

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.products
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Product"))
    }

    async fn products(&self, filters: &ProductFilters) -> Result<Vec<Product>, ApiError> {
        let mut products: Vec<Product> = self
            .products
            .values()
            .filter(|p| p.is_active && filters.matches(p))
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        Ok(self.categories.clone())
    }
}

/// Order endpoint that records what it receives.
///
/// Lines are priced from the catalog it was built with; unknown products are
/// priced at zero. Created orders are kept and served back by the read
/// endpoints.
#[derive(Default)]
pub struct RecordingOrders {
    catalog: StaticCatalog,
    requests: Mutex<Vec<CreateOrderRequest>>,
    orders: Mutex<Vec<Order>>,
    next_failure: Mutex<Option<ApiError>>,
}

impl RecordingOrders {
    #[must_use]
    pub fn priced_from(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            catalog: StaticCatalog::new(products),
            ..Self::default()
        }
    }

    /// Start with orders that already exist on the backend.
    #[must_use]
    pub fn with_orders(self, orders: impl IntoIterator<Item = Order>) -> Self {
        *lock(&self.orders) = orders.into_iter().collect();
        self
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        *lock(&self.next_failure) = Some(error);
    }

    fn take_failure(&self) -> Result<(), ApiError> {
        lock(&self.next_failure).take().map_or(Ok(()), Err)
    }

    /// Requests that reached the endpoint, including rejected ones.
    #[must_use]
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl OrderApi for RecordingOrders {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        lock(&self.requests).push(request.clone());
        self.take_failure()?;

        let order_items: Vec<OrderItem> = request
            .cart_items
            .iter()
            .zip(1..)
            .map(|(item, line_id)| {
                let unit_price = self
                    .catalog
                    .products
                    .get(&item.product_id)
                    .map_or(Decimal::ZERO, |p| p.price);
                OrderItem {
                    id: OrderItemId::new(line_id),
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price,
                    total_price: unit_price * Decimal::from(item.quantity),
                }
            })
            .collect();

        let mut orders = lock(&self.orders);
        let id = orders.iter().map(|o| o.id.as_i32()).max().unwrap_or(0) + 1;
        let order = Order {
            id: OrderId::new(id),
            order_number: format!("ORD-{id:06}"),
            customer_id: request.customer_id,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            total_amount: order_items.iter().map(|i| i.total_price).sum(),
            order_items,
            notes: None,
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, ApiError> {
        self.take_failure()?;
        Ok(lock(&self.orders)
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.take_failure()?;
        lock(&self.orders)
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| not_found("Order"))
    }
}

/// A delivered order for `customer_id` with one line per `(product, quantity)`.
#[must_use]
pub fn order(id: i32, customer_id: i32, lines: &[(&Product, u32)]) -> Order {
    let order_items: Vec<OrderItem> = lines
        .iter()
        .zip(1..)
        .map(|((product, quantity), line_id)| OrderItem {
            id: OrderItemId::new(line_id),
            product_id: product.id,
            quantity: *quantity,
            unit_price: product.price,
            total_price: product.price * Decimal::from(*quantity),
        })
        .collect();
    Order {
        id: OrderId::new(id),
        order_number: format!("ORD-{id:06}"),
        customer_id: CustomerId::new(customer_id),
        order_date: Utc
            .with_ymd_and_hms(2024, 2, 10, 14, 0, 0)
            .single()
            .expect("valid fixture date"),
        status: OrderStatus::Delivered,
        total_amount: order_items.iter().map(|i| i.total_price).sum(),
        order_items,
        notes: None,
    }
}
