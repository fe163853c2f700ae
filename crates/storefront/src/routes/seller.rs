//! Seller back office route handlers.
//!
//! Sellers manage the products they created. Admins reach these screens
//! too and may edit any product from them.

use axum::{
    extract::{Multipart, Path, State},
    response::Response,
};
use tracing::instrument;

use gamewar_core::ProductId;

use super::product_form::{self, ManageProductsTemplate, ProductFormTemplate, Screen};
use crate::error::AppError;
use crate::middleware::SellerUser;
use crate::state::AppState;

/// Display the seller's own products.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn index(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
) -> Result<ManageProductsTemplate, AppError> {
    let products = state.catalog().created_by(&member.auth.uid).await?;
    product_form::list(&state, &member, Screen::SELLER, "myProducts", &products).await
}

/// Display the new product form.
pub async fn new_product(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
) -> Result<ProductFormTemplate, AppError> {
    product_form::blank(&state, &member, Screen::SELLER).await
}

/// Display the edit form of an own product.
pub async fn edit_product(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
    Path(id): Path<String>,
) -> Result<ProductFormTemplate, AppError> {
    product_form::edit(&state, &member, Screen::SELLER, &ProductId::new(id)).await
}

/// Create a product owned by the seller.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn create_product(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    product_form::submit(&state, &member, Screen::SELLER, None, multipart).await
}

/// Update an own product.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    product_form::submit(&state, &member, Screen::SELLER, Some(&id), multipart).await
}

/// Delete an own product.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    SellerUser(member): SellerUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    product_form::delete(&state, &member, Screen::SELLER, &ProductId::new(id)).await
}
