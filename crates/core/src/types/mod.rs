//! Core types for ShopSmart.
//!
//! This module provides type-safe wrappers for common domain concepts and
//! the records exchanged with the REST backend.

pub mod category;
pub mod customer;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod status;
pub mod timestamp;

pub use category::Category;
pub use customer::{Customer, CustomerUpdate, NewCustomer};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, format_money, round_cents};
pub use order::{CartItem, CreateOrderRequest, DEFAULT_COUNTRY, Order, OrderItem, ShippingAddress};
pub use product::{Product, ProductFilters};
pub use status::{OrderStatus, OrderStatusError};
