//! Cart route handlers.
//!
//! The cart lives in the session and is mirrored to the account's remote
//! cart document after every change. Every action redirects back with a
//! flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use gamewar_core::{Cart, CheckoutDetails, ProductId, parse_count};

use super::finish;
use super::page::{Page, local_path};
use crate::error::AppError;
use crate::filters;
use crate::middleware::ActiveUser;
use crate::models::Flash;
use crate::state::AppState;

/// Cart line display data for templates.
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub quantity: u32,
    pub max_quantity: u32,
    pub line_total: String,
    pub badge: Option<&'static str>,
}

/// Cart display data for templates.
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
}

impl CartView {
    fn new(cart: &Cart, page: &Page) -> Self {
        Self {
            lines: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    product_id: item.product_id.to_string(),
                    name: item.product.name_in(page.lang).to_owned(),
                    image: item.product.image().map(str::to_owned),
                    price: page.money(&item.product.price),
                    quantity: item.quantity,
                    max_quantity: item.max_quantity(),
                    line_total: page.money(&item.line_total()),
                    badge: item.badge().map(|b| page.t(b.translation_key())),
                })
                .collect(),
            total: page.money(&cart.total()),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    /// Page to return to.
    pub next: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    #[serde(default)]
    pub quantity: String,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
    /// Prefill for the checkout phone field.
    pub phone: String,
}

/// Display the cart with current product data.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn show(State(state): State<AppState>, ActiveUser(member): ActiveUser) -> Result<CartShowTemplate, AppError> {
    let viewer = &member.viewer;
    let carts = viewer.carts(&state);
    let cart = match state.catalog().products().await {
        Ok(products) => carts.refreshed(&products).await?,
        Err(e) => {
            tracing::warn!(error = %e, "Catalog unavailable, showing stored cart");
            carts.load().await?
        }
    };

    let page = Page::new(viewer, &state).await?;
    Ok(CartShowTemplate {
        cart: CartView::new(&cart, &page),
        phone: member.profile.phone.clone().unwrap_or_default(),
        page,
    })
}

/// Add a product to the cart.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    ActiveUser(member): ActiveUser,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let viewer = &member.viewer;
    let to = local_path(form.next.as_deref(), "/products");
    let id = ProductId::new(form.product_id);

    let result = async {
        let product = state
            .catalog()
            .get(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        viewer.carts(&state).add(&product).await
    }
    .await;
    finish(viewer, result, "addedToCart", &to).await
}

/// Set the quantity of a cart line; the cart clamps it to stock.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %form.product_id))]
pub async fn update(
    State(state): State<AppState>,
    ActiveUser(member): ActiveUser,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let viewer = &member.viewer;
    let id = ProductId::new(form.product_id);
    // Unreadable input falls to the minimum of 1.
    let quantity = parse_count(&form.quantity).unwrap_or(0);
    if let Err(err) = viewer.carts(&state).set_quantity(&id, quantity).await {
        viewer.flash_error(&err).await?;
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a line from the cart.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    ActiveUser(member): ActiveUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let viewer = &member.viewer;
    let id = ProductId::new(form.product_id);
    if let Err(err) = viewer.carts(&state).remove(&id).await {
        viewer.flash_error(&err).await?;
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Place the order and empty the cart.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn checkout(
    State(state): State<AppState>,
    ActiveUser(member): ActiveUser,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let viewer = &member.viewer;
    let details = CheckoutDetails {
        phone: form.phone,
        address: form.address,
        notes: form.notes,
    };

    let carts = viewer.carts(&state);
    match state
        .checkout()
        .place_order(&member.auth, &member.profile, &carts, details, viewer.lang)
        .await
    {
        Ok(_) => {
            viewer.flash(Flash::success("orderPlaced")).await?;
            Ok(Redirect::to("/orders").into_response())
        }
        Err(err) => {
            viewer.flash_error(&err).await?;
            Ok(Redirect::to("/cart").into_response())
        }
    }
}
