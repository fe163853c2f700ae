//! Storefront operations built on the backend client.
//!
//! # Services
//!
//! - [`profiles`] - profile lookup with lazy creation, cached per uid
//! - [`catalog`] - cached product list, search and home sections
//! - [`cart`] - session cart with the per-user remote mirror
//! - [`checkout`] - turns the cart into an order
//! - [`orders`] - order listing, status changes and invoices
//! - [`back_office`] - admin and seller screens
//!
//! The cached services live in [`AppState`](crate::state::AppState); the
//! others borrow what they need per request.

pub mod back_office;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profiles;

pub use back_office::{BackOffice, Editor, NewAccount};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use orders::{OrderListing, OrderService};
pub use profiles::ProfileResolver;
