//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before the response is built; visitors only ever see a generic
//! message. Form handlers usually turn an error into a flash message with
//! [`AppError::flash_key`] and redirect instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use gamewar_core::{CartError, CheckoutError, CreditError, ProductDraftError, StockError};

use crate::backend::BackendError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend platform call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Product form error: {0}")]
    ProductDraft(#[from] ProductDraftError),

    #[error("Stock error: {0}")]
    Stock(#[from] StockError),

    #[error("Credit error: {0}")]
    Credit(#[from] CreditError),

    /// A form failed validation; carries the translation key to show.
    #[error("Invalid form: {0}")]
    Invalid(&'static str),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The visitor may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure is on our side (or the platform's) rather than
    /// caused by what the visitor sent.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Backend(err) => !err.is_user_error(),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => match err {
                BackendError::InvalidCredentials | BackendError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                BackendError::EmailExists => StatusCode::CONFLICT,
                BackendError::WeakPassword | BackendError::InvalidEmail => StatusCode::BAD_REQUEST,
                BackendError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                BackendError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(_)
            | Self::Checkout(_)
            | Self::ProductDraft(_)
            | Self::Stock(_)
            | Self::Credit(_)
            | Self::Invalid(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Translation key of the toast shown for this error.
    #[must_use]
    pub const fn flash_key(&self) -> &'static str {
        match self {
            Self::Backend(err) => match err {
                BackendError::InvalidCredentials => "invalidCredentials",
                BackendError::EmailExists => "emailExists",
                BackendError::WeakPassword => "weakPassword",
                BackendError::InvalidEmail => "allFieldsRequired",
                BackendError::TooManyAttempts => "tooManyRequests",
                BackendError::SessionExpired => "loginRequired",
                _ => "error",
            },
            Self::Cart(CartError::OutOfStock(_)) => "outOfStock",
            Self::Checkout(CheckoutError::EmptyCart) => "emptyCart",
            Self::Checkout(_) | Self::ProductDraft(_) => "allFieldsRequired",
            Self::Stock(StockError::Unchanged) => "noChanges",
            Self::Invalid(key) => *key,
            Self::NotFound(_) => "notFound",
            _ => "error",
        }
    }

    /// Log the error, capturing server-side failures to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        // Don't expose internal error details to clients
        let message = match &self {
            _ if self.is_server_error() => "Internal server error".to_owned(),
            Self::Backend(BackendError::PermissionDenied(_)) | Self::Forbidden(_) => {
                "Forbidden".to_owned()
            }
            Self::Backend(err) => err.to_string(),
            Self::NotFound(_) => "Not found".to_owned(),
            _ => self.to_string(),
        };

        (self.status(), message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "kX9a2")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_owned(),
                serde_json::Value::String((*value).to_owned()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use gamewar_core::ProductId;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("order".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BackendError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(BackendError::Api {
                status: 503,
                message: "unavailable".to_owned()
            }
            .into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(StockError::Unchanged.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_flash_keys() {
        assert_eq!(
            AppError::from(BackendError::EmailExists).flash_key(),
            "emailExists"
        );
        assert_eq!(
            AppError::from(CartError::OutOfStock(ProductId::new("p"))).flash_key(),
            "outOfStock"
        );
        assert_eq!(
            AppError::from(CheckoutError::MissingPhone).flash_key(),
            "allFieldsRequired"
        );
        assert_eq!(AppError::from(StockError::Unchanged).flash_key(), "noChanges");
        assert_eq!(AppError::Invalid("phoneUnavailable").flash_key(), "phoneUnavailable");
    }

    #[test]
    fn test_user_errors_are_not_server_errors() {
        assert!(!AppError::from(BackendError::WeakPassword).is_server_error());
        assert!(AppError::from(BackendError::NotFound("x".to_owned())).is_server_error());
        assert!(!AppError::BadRequest("x".to_owned()).is_server_error());
    }
}
