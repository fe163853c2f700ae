//! Visitor resolution and route guards.
//!
//! [`Viewer`] is the visitor as every page sees it: the session, the account
//! tokens (refreshed when close to expiry), the resolved profile and the
//! access flags derived from it. The guard extractors build on it and
//! redirect visitors who do not meet the route's [`Requirement`].

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use gamewar_core::{Access, Denial, Language, Requirement, UserProfile};

use crate::backend::AuthSession;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{Flash, session_keys};
use crate::services::{CartService, Editor};
use crate::state::AppState;

/// The current visitor, signed in or not.
pub struct Viewer {
    pub session: Session,
    pub auth: Option<AuthSession>,
    /// `None` for guests, and for accounts whose profile could not be read.
    pub profile: Option<UserProfile>,
    pub access: Access,
    pub lang: Language,
}

impl Viewer {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.auth.is_some()
    }

    /// Cart operations for this visitor.
    #[must_use]
    pub fn carts<'a>(&'a self, state: &'a AppState) -> CartService<'a> {
        CartService::new(state.backend(), &self.session, self.auth.as_ref())
    }

    /// Queue a toast for the next page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn flash(&self, flash: Flash) -> Result<(), AppError> {
        Ok(flash.push(&self.session).await?)
    }

    /// Toast for a failed action; server-side failures are reported first.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn flash_error(&self, err: &AppError) -> Result<(), AppError> {
        if err.is_server_error() {
            err.report();
        } else {
            tracing::debug!(error = %err, "Action refused");
        }
        self.flash(Flash::error(err.flash_key())).await
    }

    /// Tokens still usable, refreshing them if they are about to expire.
    async fn fresh_auth(session: &Session, state: &AppState) -> Result<Option<AuthSession>, AppError> {
        let Some(auth) = session.get::<AuthSession>(session_keys::AUTH).await? else {
            return Ok(None);
        };
        if !auth.is_expired(Utc::now()) {
            return Ok(Some(auth));
        }

        match state.backend().refresh(&auth).await {
            Ok(fresh) => {
                session.insert(session_keys::AUTH, &fresh).await?;
                tracing::debug!(uid = %fresh.uid, "Refreshed ID token");
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(uid = %auth.uid, error = %e, "Token refresh failed, signing out");
                session.remove::<AuthSession>(session_keys::AUTH).await?;
                clear_sentry_user();
                Ok(None)
            }
        }
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let lang = session
            .get::<Language>(session_keys::LANG)
            .await?
            .unwrap_or_default();
        let auth = Self::fresh_auth(&session, state).await?;

        let profile = match &auth {
            Some(auth) => {
                set_sentry_user(&auth.uid, Some(&auth.email));
                match state.profiles().resolve(auth).await {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        tracing::warn!(uid = %auth.uid, error = %e, "Profile unavailable, treating as guest");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            access: Access::derive(profile.as_ref()),
            session,
            auth,
            profile,
            lang,
        })
    }
}

/// A signed-in visitor with a resolved profile.
pub struct Member {
    pub viewer: Viewer,
    pub auth: AuthSession,
    pub profile: UserProfile,
}

impl Member {
    /// The member acting on products.
    #[must_use]
    pub const fn editor(&self) -> Editor<'_> {
        Editor {
            auth: &self.auth,
            is_admin: self.viewer.access.is_admin,
        }
    }
}

/// Rejection of the guard extractors.
pub enum GuardRejection {
    Error(AppError),
    Redirect(&'static str),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Error(err) => err.into_response(),
            Self::Redirect(path) => Redirect::to(path).into_response(),
        }
    }
}

async fn require(parts: &mut Parts, state: &AppState, requirement: Requirement) -> Result<Member, GuardRejection> {
    let viewer = Viewer::from_request_parts(parts, state)
        .await
        .map_err(GuardRejection::Error)?;

    if let Err(denial) = viewer.access.check(viewer.signed_in(), requirement) {
        tracing::debug!(path = %parts.uri.path(), ?denial, "Access denied");
        let key = match denial {
            Denial::Login => "loginRequired",
            Denial::Home => "accountActivationRequired",
        };
        // Only inactive accounts get the activation hint.
        if denial == Denial::Login || !viewer.access.is_active {
            viewer
                .flash(Flash::warning(key))
                .await
                .map_err(GuardRejection::Error)?;
        }
        return Err(GuardRejection::Redirect(denial.redirect_path()));
    }

    match (viewer.auth.clone(), viewer.profile.clone()) {
        (Some(auth), Some(profile)) => Ok(Member {
            viewer,
            auth,
            profile,
        }),
        _ => Err(GuardRejection::Redirect(Denial::Login.redirect_path())),
    }
}

macro_rules! guard {
    ($(#[$doc:meta])* $name:ident, $requirement:expr) => {
        $(#[$doc])*
        pub struct $name(pub Member);

        impl FromRequestParts<AppState> for $name {
            type Rejection = GuardRejection;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                require(parts, state, $requirement).await.map(Self)
            }
        }
    };
}

guard!(
    /// Signed in with an active account: cart and orders.
    ActiveUser,
    Requirement::ACTIVE_USER
);
guard!(
    /// Active admin.
    AdminUser,
    Requirement::ADMIN
);
guard!(
    /// Active seller, or an admin acting as one.
    SellerUser,
    Requirement::SELLER
);

/// Start a signed-in session.
///
/// The session id is cycled, the cart is reconciled with the remote mirror
/// and the profile is resolved (and created on first sign-in).
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn sign_in(session: &Session, state: &AppState, auth: AuthSession) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(session_keys::AUTH, &auth).await?;
    set_sentry_user(&auth.uid, Some(&auth.email));

    if let Err(e) = state.profiles().resolve(&auth).await {
        tracing::warn!(uid = %auth.uid, error = %e, "Profile unavailable at sign-in");
    }

    match state.catalog().products().await {
        Ok(products) => {
            CartService::new(state.backend(), session, Some(&auth))
                .restore_on_sign_in(&products)
                .await?;
        }
        Err(e) => tracing::warn!(error = %e, "Catalog unavailable, cart not restored"),
    }

    tracing::info!(uid = %auth.uid, "Signed in");
    Ok(())
}

/// End the signed-in session. The cart stays with the account's mirror.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn sign_out(session: &Session) -> Result<(), AppError> {
    if let Some(auth) = session.remove::<AuthSession>(session_keys::AUTH).await? {
        tracing::info!(uid = %auth.uid, "Signed out");
    }
    session.remove::<serde_json::Value>(session_keys::CART).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    Ok(())
}
