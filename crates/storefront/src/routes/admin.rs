//! Admin back office route handlers.
//!
//! Users tab (accounts, roles, statuses, credit), product management and
//! the stock screen with per-product history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use gamewar_core::{
    CreditAdjustment, Dinars, ProductId, StockError, StockFilter, UserId, UserRole, UserStatus,
    catalog, parse_count,
};

use super::page::{Choice, Page, local_path};
use super::product_form::{self, ManageProductsTemplate, ProductFormTemplate, Screen};
use super::finish;
use crate::error::AppError;
use crate::filters;
use crate::middleware::AdminUser;
use crate::models::Flash;
use crate::services::NewAccount;
use crate::state::AppState;

// =============================================================================
// Users
// =============================================================================

/// User row display data.
pub struct UserRow {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub credit: String,
    pub created_at: String,
    pub roles: Vec<Choice>,
    pub statuses: Vec<Choice>,
}

fn role_choices(current: UserRole, page: &Page) -> Vec<Choice> {
    UserRole::ALL
        .into_iter()
        .map(|r| Choice::new(r.as_str(), r.as_str(), r == current, page.lang))
        .collect()
}

fn status_choices(current: UserStatus, page: &Page) -> Vec<Choice> {
    UserStatus::ALL
        .into_iter()
        .map(|s| Choice::new(s.as_str(), s.as_str(), s == current, page.lang))
        .collect()
}

/// Users tab template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: Page,
    pub users: Vec<UserRow>,
    /// Role choices for the create form.
    pub new_roles: Vec<Choice>,
}

/// Create account form data.
#[derive(Deserialize)]
pub struct CreateUserForm {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: String,
    pub role: String,
    #[serde(default)]
    pub credit: String,
}

impl CreateUserForm {
    fn into_account(self) -> Result<NewAccount, AppError> {
        let role = self
            .role
            .parse()
            .map_err(|_| AppError::Invalid("allFieldsRequired"))?;
        let credit = match self.credit.trim() {
            "" => Dinars::ZERO,
            value => value
                .parse::<Decimal>()
                .map(Dinars::new)
                .map_err(|_| AppError::Invalid("allFieldsRequired"))?,
        };
        Ok(NewAccount {
            email: self.email,
            password: self.password,
            display_name: self.display_name,
            phone: self.phone,
            role,
            credit,
        })
    }
}

/// Role change form data.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Credit adjustment form data.
#[derive(Debug, Deserialize)]
pub struct CreditForm {
    pub amount: String,
    #[serde(default)]
    pub reason: String,
}

/// Display every account.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn users(State(state): State<AppState>, AdminUser(member): AdminUser) -> Result<UsersTemplate, AppError> {
    let users = state.back_office().users(&member.auth).await?;

    let page = Page::new(&member.viewer, &state).await?;
    Ok(UsersTemplate {
        users: users
            .into_iter()
            .map(|user| UserRow {
                uid: user.uid.to_string(),
                name: user.display_name.clone().unwrap_or_default(),
                phone: user.phone.clone().unwrap_or_default(),
                credit: user.credit.format_amount(),
                created_at: user.created_at.format("%d/%m/%Y").to_string(),
                roles: role_choices(user.role, &page),
                statuses: status_choices(user.status, &page),
                email: user.email,
            })
            .collect(),
        new_roles: role_choices(UserRole::User, &page),
        page,
    })
}

/// Create an account with an active profile.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Form(form): Form<CreateUserForm>,
) -> Result<Response, AppError> {
    let result = match form.into_account() {
        Ok(account) => state.back_office().create_account(&member.auth, account).await,
        Err(err) => Err(err),
    };
    finish(&member.viewer, result, "userCreated", "/admin").await
}

/// Change an account's role.
#[instrument(skip_all, fields(uid = %member.auth.uid, target = %uid))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(uid): Path<String>,
    Form(form): Form<RoleForm>,
) -> Result<Response, AppError> {
    let result = match form.role.parse::<UserRole>() {
        Ok(role) => {
            state
                .back_office()
                .set_role(&member.auth, &UserId::new(uid), role)
                .await
        }
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    };
    finish(&member.viewer, result, "roleUpdated", "/admin").await
}

/// Activate or suspend an account.
#[instrument(skip_all, fields(uid = %member.auth.uid, target = %uid))]
pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(uid): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let result = match form.status.parse::<UserStatus>() {
        Ok(status) => {
            state
                .back_office()
                .set_status(&member.auth, &UserId::new(uid), status)
                .await
        }
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    };
    finish(&member.viewer, result, "statusUpdated", "/admin").await
}

/// Add to or take from an account's credit.
#[instrument(skip_all, fields(uid = %member.auth.uid, target = %uid))]
pub async fn adjust_credit(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(uid): Path<String>,
    Form(form): Form<CreditForm>,
) -> Result<Response, AppError> {
    let result = match form.amount.trim().parse::<i64>() {
        Ok(amount) => {
            let adjustment = CreditAdjustment {
                amount,
                reason: form.reason.trim().to_owned(),
            };
            state
                .back_office()
                .adjust_credit(&member.auth, &UserId::new(uid), &adjustment)
                .await
        }
        Err(_) => Err(AppError::Invalid("allFieldsRequired")),
    };
    finish(&member.viewer, result, "creditAdjusted", "/admin").await
}

// =============================================================================
// Products
// =============================================================================

/// Display every product.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn products(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
) -> Result<ManageProductsTemplate, AppError> {
    let products = state.catalog().products().await?;
    product_form::list(&state, &member, Screen::ADMIN, "manageProducts", &products).await
}

/// Display the new product form.
pub async fn new_product(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
) -> Result<ProductFormTemplate, AppError> {
    product_form::blank(&state, &member, Screen::ADMIN).await
}

/// Display the edit form of any product.
pub async fn edit_product(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
) -> Result<ProductFormTemplate, AppError> {
    product_form::edit(&state, &member, Screen::ADMIN, &ProductId::new(id)).await
}

/// Create a product.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    product_form::submit(&state, &member, Screen::ADMIN, None, multipart).await
}

/// Update a product.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    product_form::submit(&state, &member, Screen::ADMIN, Some(&id), multipart).await
}

/// Delete a product.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    product_form::delete(&state, &member, Screen::ADMIN, &ProductId::new(id)).await
}

// =============================================================================
// Stock
// =============================================================================

/// Stock screen query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub q: Option<String>,
    pub filter: Option<String>,
}

/// Stock row display data.
pub struct StockRow {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub category: &'static str,
    pub price: String,
    pub stock: u32,
    pub level_class: &'static str,
    pub level_label: &'static str,
    pub orders: usize,
    pub history: usize,
}

/// Stock screen template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/stock.html")]
pub struct StockTemplate {
    pub page: Page,
    pub search: String,
    pub filters: Vec<Choice>,
    pub rows: Vec<StockRow>,
    /// Path of this screen, to come back to after saving.
    pub current: String,
}

/// Stock save form data.
#[derive(Debug, Deserialize)]
pub struct StockForm {
    #[serde(default)]
    pub stock: String,
    pub next: Option<String>,
}

/// Display stock levels with search and a level filter.
#[instrument(skip_all, fields(uid = %member.auth.uid))]
pub async fn stock(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Query(query): Query<StockQuery>,
) -> Result<StockTemplate, AppError> {
    let viewer = &member.viewer;
    let search = query.q.unwrap_or_default().trim().to_owned();
    let filter = query
        .filter
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or(StockFilter::All);

    let products = state.catalog().products().await?;
    let counts = match state.orders().list_for(&member.auth, &viewer.access).await {
        Ok(listing) => catalog::order_counts(&listing.orders),
        Err(e) => {
            tracing::warn!(error = %e, "Order counts unavailable");
            std::collections::HashMap::new()
        }
    };

    let page = Page::new(viewer, &state).await?;
    let rows = catalog::admin_filter(&products, &search, filter, page.lang)
        .into_iter()
        .map(|p| {
            let level = p.stock_level();
            StockRow {
                id: p.id.to_string(),
                name: p.name_in(page.lang).to_owned(),
                image: p.image().map(str::to_owned),
                category: page.t(p.category.translation_key()),
                price: page.money(&p.price),
                stock: p.stock,
                level_class: level.css_class(),
                level_label: page.t(level.translation_key()),
                orders: counts.get(&p.id).copied().unwrap_or(0),
                history: p.stock_history.len(),
            }
        })
        .collect();

    let filters = StockFilter::ALL
        .into_iter()
        .map(|f| Choice::new(f.as_str(), f.translation_key(), f == filter, page.lang))
        .collect();

    let current = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("q", &search)
        .append_pair("filter", filter.as_str())
        .finish();

    Ok(StockTemplate {
        page,
        search,
        filters,
        rows,
        current: format!("/admin/stock?{current}"),
    })
}

/// Save a new stock quantity, appending to the product's history.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn save_stock(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<StockForm>,
) -> Result<Response, AppError> {
    let viewer = &member.viewer;
    let to = local_path(form.next.as_deref(), "/admin/stock");
    let result = match parse_count(&form.stock) {
        Some(stock) => {
            state
                .back_office()
                .update_stock(member.editor(), &ProductId::new(id), stock)
                .await
        }
        None => Err(AppError::Invalid("allFieldsRequired")),
    };

    match result {
        Err(AppError::Stock(StockError::Unchanged)) => {
            viewer.flash(Flash::warning("noChanges")).await?;
            Ok(Redirect::to(&to).into_response())
        }
        result => finish(viewer, result, "stockUpdated", &to).await,
    }
}

/// History row display data.
pub struct HistoryRow {
    pub date: String,
    pub previous: u32,
    pub new: u32,
    pub delta: i64,
    pub by: String,
}

/// Stock history template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/stock_history.html")]
pub struct StockHistoryTemplate {
    pub page: Page,
    pub name: String,
    pub stock: u32,
    pub rows: Vec<HistoryRow>,
}

/// Display a product's stock history, newest first.
#[instrument(skip_all, fields(uid = %member.auth.uid, product_id = %id))]
pub async fn stock_history(
    State(state): State<AppState>,
    AdminUser(member): AdminUser,
    Path(id): Path<String>,
) -> Result<StockHistoryTemplate, AppError> {
    let product = state
        .back_office()
        .editable_product(member.editor(), &ProductId::new(id))
        .await?;

    let page = Page::new(&member.viewer, &state).await?;
    Ok(StockHistoryTemplate {
        name: product.name_in(page.lang).to_owned(),
        stock: product.stock,
        rows: product
            .stock_history
            .iter()
            .rev()
            .map(|entry| HistoryRow {
                date: entry.updated_at.format("%d/%m/%Y %H:%M").to_string(),
                previous: entry.previous_stock,
                new: entry.new_stock,
                delta: entry.delta(),
                by: entry.updated_by.clone(),
            })
            .collect(),
        page,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(role: &str, credit: &str) -> CreateUserForm {
        CreateUserForm {
            email: "new@gamewar.dz".to_owned(),
            password: "secret1".to_owned(),
            display_name: "Amine".to_owned(),
            phone: "0555".to_owned(),
            role: role.to_owned(),
            credit: credit.to_owned(),
        }
    }

    #[test]
    fn test_create_user_form_parsing() {
        let account = form("seller", " 250 ").into_account().unwrap();
        assert_eq!(account.role, UserRole::Seller);
        assert_eq!(account.credit, Dinars::from_whole(250));

        assert_eq!(form("user", "").into_account().unwrap().credit, Dinars::ZERO);
        assert_eq!(
            form("user", "12.5").into_account().unwrap().credit,
            Dinars::new(Decimal::new(125, 1))
        );
        assert!(form("emperor", "").into_account().is_err());
        assert!(form("user", "lots").into_account().is_err());
    }
}
