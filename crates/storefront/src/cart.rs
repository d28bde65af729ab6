//! Shopping cart state.
//!
//! [`CartState`] is the value: line items in insertion order plus totals
//! derived from them. [`CartStore`] is the process-wide container that owns
//! the current state, applies mutations, and mirrors the items to durable
//! storage.
//!
//! Totals are never patched incrementally. Every mutation ends with a full
//! fold over the items, so `total_item_count` and `total_amount` always agree
//! with the lines they summarize.
//!
//! Once the owning provider has shut down, mutations are rejected and logged
//! as errors. Reads keep returning the last state.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use shop_smart_core::{Money, Product, ProductId};

use crate::context::ContextError;
use crate::error::add_breadcrumb;
use crate::persistence::Persister;
use crate::storage::{CART_KEY, KeyValueStorage, load_json};

// =============================================================================
// Line Items
// =============================================================================

/// One cart row: a product and how many of it.
///
/// `line_total` is always `quantity × product.price` using the product
/// snapshot stored on the line. It has no setter and is recomputed when a
/// line is restored from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredLineItem")]
pub struct CartLineItem {
    product_id: ProductId,
    quantity: u32,
    product: Product,
    line_total: Money,
}

/// Storage shape of a line; the stored total is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLineItem {
    quantity: u32,
    product: Product,
}

impl From<StoredLineItem> for CartLineItem {
    fn from(stored: StoredLineItem) -> Self {
        Self::new(stored.product, stored.quantity)
    }
}

impl CartLineItem {
    fn new(product: Product, quantity: u32) -> Self {
        let mut line = Self {
            product_id: product.id,
            quantity,
            product,
            line_total: Decimal::ZERO,
        };
        line.set_quantity(quantity);
        line
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = Decimal::from(quantity) * self.product.price;
    }

    /// Product this line is for.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Units of the product in the cart.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Product snapshot taken when the line was created.
    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    /// `quantity × product.price`.
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.line_total
    }
}

// =============================================================================
// Cart State
// =============================================================================

/// Cart contents and derived totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartLineItem>,
    total_item_count: u64,
    total_amount: Money,
    is_open: bool,
}

impl CartState {
    /// Build a state from restored lines.
    ///
    /// Lines with zero quantity are dropped and repeated product ids are
    /// merged into the first occurrence, so hand-edited storage cannot break
    /// the one-line-per-product rule.
    #[must_use]
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        let mut state = Self::default();
        for line in items {
            if line.quantity > 0 {
                state.upsert(line.product, line.quantity);
            }
        }
        state.recompute_totals();
        state
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub const fn total_item_count(&self) -> u64 {
        self.total_item_count
    }

    /// Sum of line totals over all lines.
    #[must_use]
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Whether the cart drawer is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of a product, 0 if not in the cart.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, CartLineItem::quantity)
    }

    /// Whether a line exists for the product.
    #[must_use]
    pub fn is_item_in_cart(&self, product_id: ProductId) -> bool {
        self.line(product_id).is_some()
    }

    fn line(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.product_id == product_id)
    }

    /// Add to an existing line or append a new one. Totals are stale until
    /// `recompute_totals`.
    fn upsert(&mut self, product: Product, quantity: u32) {
        match self.items.iter_mut().find(|line| line.product_id == product.id) {
            // The stored snapshot keeps its price; the new snapshot is dropped.
            Some(line) => line.set_quantity(line.quantity.saturating_add(quantity)),
            None => self.items.push(CartLineItem::new(product, quantity)),
        }
    }

    fn add(&mut self, product: &Product, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        self.upsert(product.clone(), quantity);
        self.recompute_totals();
        true
    }

    fn remove(&mut self, product_id: ProductId) -> bool {
        let Some(index) = self.position(product_id) else {
            return false;
        };
        self.items.remove(index);
        self.recompute_totals();
        true
    }

    fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let Some(line) = self.items.iter_mut().find(|line| line.product_id == product_id) else {
            return false;
        };
        line.set_quantity(quantity);
        self.recompute_totals();
        true
    }

    fn clear(&mut self) {
        self.items.clear();
        self.recompute_totals();
    }

    fn recompute_totals(&mut self) {
        let (count, amount) = self
            .items
            .iter()
            .fold((0_u64, Decimal::ZERO), |(count, amount), line| {
                (count + u64::from(line.quantity), amount + line.line_total)
            });
        self.total_item_count = count;
        self.total_amount = amount;
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// The application's cart.
///
/// Mutations are synchronous and never fail the caller. Each one that changes
/// the items queues a best-effort write of the full item list; storage
/// failures are logged by the persistence worker.
pub struct CartStore {
    state: RwLock<CartState>,
    persister: Persister,
}

impl CartStore {
    /// Restore the cart from storage, failing open to an empty cart.
    pub fn load(storage: &dyn KeyValueStorage, persister: Persister) -> Self {
        let items: Vec<CartLineItem> = load_json(storage, CART_KEY).unwrap_or_default();
        let state = CartState::from_items(items);
        debug!(
            lines = state.items.len(),
            total_items = state.total_item_count,
            "Cart restored"
        );
        Self::with_state(state, persister)
    }

    /// Create a store with a given initial state.
    #[must_use]
    pub const fn with_state(state: CartState, persister: Persister) -> Self {
        Self {
            state: RwLock::new(state),
            persister,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// False, with an error logged, if the provider has shut down.
    fn is_live(&self, op: &str) -> bool {
        if self.persister.is_closed() {
            let e = ContextError::OutsideProvider { store: "cart" };
            error!(op, error = %e, "Cart change rejected");
            return false;
        }
        true
    }

    /// Apply a mutation and persist the items if it changed them.
    ///
    /// Returns whether the items changed.
    fn mutate(&self, op: &str, f: impl FnOnce(&mut CartState) -> bool) -> bool {
        if !self.is_live(op) {
            return false;
        }
        let mut state = self.write();
        if f(&mut state) {
            debug!(
                op,
                lines = state.items.len(),
                total_items = state.total_item_count,
                total_amount = %state.total_amount,
                "Cart updated"
            );
            self.persister.save(CART_KEY, &state.items);
            true
        } else {
            debug!(op, "Cart unchanged");
            false
        }
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line keeps its original product snapshot; only its
    /// quantity and total change. A quantity of zero is ignored. Stock limits
    /// are the caller's concern.
    pub fn add_item(&self, product: &Product, quantity: u32) {
        if self.mutate("add_item", |state| state.add(product, quantity)) {
            let product_id = product.id.to_string();
            add_breadcrumb("cart", "Added item", &[("product_id", product_id.as_str())]);
        }
    }

    /// Add a single unit of `product`.
    pub fn add_one(&self, product: &Product) {
        self.add_item(product, 1);
    }

    /// Remove the product's line. Absent products are ignored.
    pub fn remove_item(&self, product_id: ProductId) {
        self.mutate("remove_item", |state| state.remove(product_id));
    }

    /// Set the product's quantity; zero or negative removes the line.
    ///
    /// Values above `u32::MAX` are clamped. Absent products are ignored.
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) {
        self.mutate("update_quantity", |state| {
            state.update_quantity(product_id, quantity)
        });
    }

    /// Remove every line.
    pub fn clear_cart(&self) {
        self.mutate("clear_cart", |state| {
            state.clear();
            // Always mirror the empty list, even if the cart was already empty.
            true
        });
    }

    /// Flip the drawer flag.
    pub fn toggle_cart(&self) {
        if self.is_live("toggle_cart") {
            let mut state = self.write();
            state.is_open = !state.is_open;
        }
    }

    /// Open the drawer.
    pub fn open_cart(&self) {
        if self.is_live("open_cart") {
            self.write().is_open = true;
        }
    }

    /// Close the drawer.
    pub fn close_cart(&self) {
        if self.is_live("close_cart") {
            self.write().is_open = false;
        }
    }

    /// Quantity of a product, 0 if not in the cart.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.read().item_quantity(product_id)
    }

    /// Whether a line exists for the product.
    #[must_use]
    pub fn is_item_in_cart(&self, product_id: ProductId) -> bool {
        self.read().is_item_in_cart(product_id)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.read().clone()
    }

    /// Copy of the current line items.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.read().items.clone()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.read().total_item_count
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.read().total_amount
    }

    /// Whether the drawer is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.read().is_open
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }
}
