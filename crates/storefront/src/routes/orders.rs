//! Order route handlers.
//!
//! Customers see their own orders. Admins see every order with the
//! customer's contact details, and can move orders forward, open the
//! invoice PDF or send it over WhatsApp.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use gamewar_core::{Order, OrderId, OrderStatus};

use super::finish;
use super::page::Page;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{ActiveUser, AdminUser};
use crate::models::Flash;
use crate::services::OrderListing;
use crate::state::AppState;

/// Order line display data.
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Next status an admin can move the order to.
pub struct OrderAction {
    pub status: &'static str,
    pub label: &'static str,
}

/// Order display data.
pub struct OrderView {
    pub id: String,
    pub short_ref: String,
    pub created_at: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub tax: String,
    pub total_with_tax: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub phone: String,
    pub address: String,
    pub notes: String,
    pub next: Option<OrderAction>,
}

impl OrderView {
    fn new(order: &Order, listing: &OrderListing, page: &Page) -> Self {
        let customer = listing.customer(order);
        // Stored snapshot first, then the live profile.
        let pick = |snapshot: &str, live: Option<&str>| -> String {
            if snapshot.is_empty() {
                live.unwrap_or_default().to_owned()
            } else {
                snapshot.to_owned()
            }
        };

        Self {
            id: order.id.to_string(),
            short_ref: order.short_ref().to_owned(),
            created_at: order.created_at.format("%d/%m/%Y %H:%M").to_string(),
            status: order.status.as_str(),
            status_label: page.t(order.status.as_str()),
            lines: order
                .items
                .iter()
                .map(|line| OrderLineView {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    price: page.money(&line.price),
                    line_total: page.money(&line.line_total()),
                })
                .collect(),
            subtotal: page.money(&order.total),
            tax: page.money(&order.tax()),
            total_with_tax: page.money(&order.total_with_tax()),
            customer_name: pick(&order.user_name, customer.and_then(|c| c.display_name.as_deref())),
            customer_email: pick(&order.user_email, customer.map(|c| c.email.as_str())),
            customer_phone: pick(&order.user_phone, customer.and_then(|c| c.phone.as_deref())),
            phone: order.phone.clone().unwrap_or_default(),
            address: order.delivery_address.clone().unwrap_or_default(),
            notes: order.notes.clone().unwrap_or_default(),
            next: order.status.next().map(|next| OrderAction {
                status: next.as_str(),
                label: page.t(match next {
                    OrderStatus::Confirmed => "confirmOrder",
                    _ => "markDelivered",
                }),
            }),
        }
    }
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<OrderView>,
}

/// Display the visitor's orders, or every order for admins.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn index(State(state): State<AppState>, ActiveUser(member): ActiveUser) -> Result<OrdersTemplate, AppError> {
    let viewer = &member.viewer;
    let listing = state.orders().list_for(&member.auth, &viewer.access).await?;

    let page = Page::new(viewer, &state).await?;
    Ok(OrdersTemplate {
        orders: listing
            .orders
            .iter()
            .map(|order| OrderView::new(order, &listing, &page))
            .collect(),
        page,
    })
}

/// Move an order to its next status.
#[instrument(skip_all, fields(uid = %member.auth.uid, order_id = %id))]
pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let id = OrderId::new(id);
    let result = match form.status.parse::<OrderStatus>() {
        Ok(to) => state.orders().advance(&member.auth, &id, to).await,
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    };
    finish(&member.viewer, result, "statusUpdated", "/orders").await
}

/// Redirect to the generated invoice PDF.
#[instrument(skip_all, fields(uid = %member.auth.uid, order_id = %id))]
pub async fn invoice(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match state.orders().invoice_url(&member.auth, &OrderId::new(id)).await {
        Ok(url) => Ok(Redirect::to(&url).into_response()),
        Err(err) => invoice_failed(&member.viewer, &err).await,
    }
}

/// Redirect to WhatsApp with the invoice message for the customer.
#[instrument(skip_all, fields(uid = %member.auth.uid, order_id = %id))]
pub async fn whatsapp(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match state.orders().whatsapp_invoice(&member.auth, &OrderId::new(id)).await {
        Ok(link) => Ok(Redirect::to(&link).into_response()),
        Err(err) => invoice_failed(&member.viewer, &err).await,
    }
}

async fn invoice_failed(viewer: &crate::middleware::Viewer, err: &AppError) -> Result<Response, AppError> {
    if let AppError::Invalid(_) = err {
        viewer.flash_error(err).await?;
    } else {
        err.report();
        viewer.flash(Flash::error("invoiceError")).await?;
    }
    Ok(Redirect::to("/orders").into_response())
}
