//! GameWar Core - domain types and storefront rules.
//!
//! This crate is shared by every GameWar component:
//! - `storefront` - the public shop plus the admin and seller back office
//! - `cli` - command-line tools for back-office chores
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no backend access. Everything the shop decides on its own (who
//! may see prices, how the cart clamps quantities, what an order snapshot
//! contains) lives here so it can be tested without a network.
//!
//! # Modules
//!
//! - [`types`] - document ids, emails, dinar amounts and status enums
//! - [`i18n`] - French/Arabic language handling and the translation table
//! - [`profile`] - user profiles and role/visibility derivation
//! - [`product`] - products, categories and stock history
//! - [`cart`] - the visitor cart
//! - [`order`] - order snapshots composed at checkout
//! - [`catalog`] - search, category and stock filters
//! - [`credit`] - credit ledger entries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod credit;
pub mod i18n;
pub mod order;
pub mod product;
pub mod profile;
pub mod types;

pub use cart::{Cart, CartError, CartItem, RemoteCart, RemoteCartLine};
pub use catalog::{CatalogFilter, StockFilter};
pub use credit::{CreditAdjustment, CreditError, CreditLog, NewCreditLog};
pub use i18n::{Language, Localized, translate};
pub use order::{CheckoutDetails, CheckoutError, NewOrder, Order, OrderLine};
pub use product::{
    CartStockBadge, Category, Product, ProductDraft, ProductDraftError, StockError,
    StockHistoryEntry, StockLevel, parse_count,
};
pub use profile::{Access, Denial, Requirement, UserProfile};
pub use types::*;
