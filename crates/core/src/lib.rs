//! ShopSmart Core - Shared domain types.
//!
//! This crate provides the types exchanged between the storefront client
//! state (`shop-smart-storefront`), the REST backend, and the `shop-cli`
//! front end.
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, and the catalog/customer/order
//!   records returned by the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
