//! Authentication route handlers.
//!
//! Email/password sign-in against the auth service. Accounts are created by
//! admins from the back office; the login page only invites visitors to ask
//! for one.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use gamewar_core::Email;

use super::page::Page;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{Viewer, sign_in, sign_out};
use crate::models::Flash;
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
}

/// Display the login page.
pub async fn login_page(State(state): State<AppState>, viewer: Viewer) -> Result<Response, AppError> {
    if viewer.signed_in() {
        return Ok(Redirect::to("/").into_response());
    }
    let page = Page::new(&viewer, &state).await?;
    Ok(LoginTemplate { page }.into_response())
}

/// Sign in and return to the home page.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Ok(email) = Email::parse(&form.email) else {
        viewer.flash(Flash::error("invalidCredentials")).await?;
        return Ok(Redirect::to("/auth/login").into_response());
    };
    match state
        .backend()
        .sign_in(email.as_str(), &form.password)
        .await
    {
        Ok(auth) => {
            sign_in(&viewer.session, &state, auth).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::info!(error = %e, "Sign-in refused");
            viewer.flash_error(&AppError::from(e)).await?;
            Ok(Redirect::to("/auth/login").into_response())
        }
    }
}

/// Sign out and return to the home page.
#[instrument(skip_all)]
pub async fn logout(viewer: Viewer) -> Result<Response, AppError> {
    sign_out(&viewer.session).await?;
    Ok(Redirect::to("/").into_response())
}
