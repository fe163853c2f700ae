//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home: category tiles and newest products
//! GET  /products?q=&category=     - Catalog with search and category filter
//! GET  /health, /health/ready     - Health checks
//! GET  /lang/{code}               - Switch interface language
//!
//! # Cart (active account)
//! GET  /cart                      - Cart page with checkout form
//! POST /cart/add                  - Add a product
//! POST /cart/update               - Set a line quantity (clamped to stock)
//! POST /cart/remove               - Remove a line
//! POST /cart/checkout             - Place the order
//!
//! # Orders (active account; actions are admin only)
//! GET  /orders                    - Own orders, or every order for admins
//! POST /orders/{id}/status        - Advance the order status
//! GET  /orders/{id}/invoice       - Redirect to the invoice PDF
//! GET  /orders/{id}/whatsapp      - Redirect to WhatsApp with the invoice
//!
//! # Account
//! GET  /account/credit            - Credit balance and history
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action (rate limited)
//! POST /auth/logout               - Logout action
//!
//! # Admin
//! GET  /admin                     - Users tab
//! POST /admin/users               - Create an account
//! POST /admin/users/{uid}/role    - Change role
//! POST /admin/users/{uid}/status  - Change status
//! POST /admin/users/{uid}/credit  - Adjust credit
//! GET  /admin/products            - Product list
//! GET  /admin/products/new        - New product form
//! POST /admin/products            - Create product
//! GET  /admin/products/{id}/edit  - Edit product form
//! POST /admin/products/{id}       - Update product
//! POST /admin/products/{id}/delete - Delete product
//! GET  /admin/stock?q=&filter=    - Stock screen
//! POST /admin/stock/{id}          - Save a stock quantity
//! GET  /admin/stock/{id}/history  - Stock history of a product
//!
//! # Seller (seller or admin)
//! GET  /seller                    - Own products
//! GET  /seller/products/new       - New product form
//! POST /seller/products           - Create product
//! GET  /seller/products/{id}/edit - Edit product form
//! POST /seller/products/{id}      - Update product
//! POST /seller/products/{id}/delete - Delete product
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod home;
pub mod lang;
pub mod orders;
pub mod page;
pub mod product_form;
pub mod products;
pub mod seller;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::{Viewer, auth_rate_limiter};
use crate::models::Flash;
use crate::state::AppState;

pub use page::Page;

/// Largest accepted product form, image included.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Flash the outcome of a form action and redirect.
///
/// # Errors
///
/// Returns an error only if the session cannot be written.
pub(crate) async fn finish<T>(
    viewer: &Viewer,
    result: Result<T, AppError>,
    success_key: &'static str,
    to: &str,
) -> Result<Response, AppError> {
    match result {
        Ok(_) => viewer.flash(Flash::success(success_key)).await?,
        Err(err) => viewer.flash_error(&err).await?,
    }
    Ok(Redirect::to(to).into_response())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).route_layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/status", post(orders::set_status))
        .route("/{id}/invoice", get(orders::invoice))
        .route("/{id}/whatsapp", get(orders::whatsapp))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::users))
        .route("/users", post(admin::create_user))
        .route("/users/{uid}/role", post(admin::set_role))
        .route("/users/{uid}/status", post(admin::set_status))
        .route("/users/{uid}/credit", post(admin::adjust_credit))
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route("/products/new", get(admin::new_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/edit", get(admin::edit_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/stock", get(admin::stock))
        .route("/stock/{id}", post(admin::save_stock))
        .route("/stock/{id}/history", get(admin::stock_history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(seller::index))
        .route("/products", post(seller::create_product))
        .route("/products/new", get(seller::new_product))
        .route("/products/{id}", post(seller::update_product))
        .route("/products/{id}/edit", get(seller::edit_product))
        .route("/products/{id}/delete", post(seller::delete_product))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/products", get(products::index))
        .route("/lang/{code}", get(lang::switch))
        .route("/account/credit", get(account::credit))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
        .nest("/seller", seller_routes())
}
