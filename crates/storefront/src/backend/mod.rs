//! Client for the managed backend platform.
//!
//! # Architecture
//!
//! - The platform is the source of truth: no local database, direct calls
//! - [`Backend`] is a cheaply clonable facade dispatching to one of two
//!   implementations chosen at startup
//! - [`FirebaseClient`] speaks the platform's REST APIs (auth, document
//!   database, storage, callable functions)
//! - [`MemoryBackend`] keeps everything in process maps, for development
//!   and tests
//!
//! Calls made on behalf of a signed-in user carry that user's
//! [`AuthSession`]; product reads are public.

pub mod firebase;
pub mod memory;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use gamewar_core::{
    CreditLog, Dinars, Order, OrderId, OrderStatus, Product, ProductId, RemoteCart, UserId,
    UserProfile, UserRole, UserStatus,
};

pub use firebase::FirebaseClient;
pub use memory::MemoryBackend;

use crate::config::BackendConfig;

/// Seconds before expiry at which an ID token is refreshed.
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// Errors that can occur when talking to the backend platform.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailExists,

    #[error("password is too weak")]
    WeakPassword,

    #[error("invalid email address")]
    InvalidEmail,

    /// The refresh token was revoked or the account disabled.
    #[error("session expired")]
    SessionExpired,

    #[error("too many attempts, try again later")]
    TooManyAttempts,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A stored document could not be decoded.
    #[error("malformed document {path}: {reason}")]
    Document { path: String, reason: String },

    /// Any other non-success answer.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl BackendError {
    /// Whether the error was caused by what the visitor submitted rather than
    /// by the platform.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::EmailExists
                | Self::WeakPassword
                | Self::InvalidEmail
                | Self::TooManyAttempts
        )
    }
}

/// Tokens of a signed-in account.
///
/// Stored in the server-side session; only the session id reaches the
/// browser. Implements `Debug` manually to redact the tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub uid: UserId,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Build a session from a token lifetime in seconds.
    #[must_use]
    pub fn new(
        uid: UserId,
        email: String,
        id_token: String,
        refresh_token: String,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid,
            email,
            id_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in),
        }
    }

    /// Check if the ID token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Profile fields an admin or the owner may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub credit: Option<Dinars>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfilePatch {
    #[must_use]
    pub fn role(role: UserRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn credit(credit: Dinars) -> Self {
        Self {
            credit: Some(credit),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.status.is_none()
            && self.credit.is_none()
            && self.display_name.is_none()
            && self.phone.is_none()
    }

    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(status) = self.status {
            profile.status = status;
        }
        if let Some(credit) = self.credit {
            profile.credit = credit;
        }
        if let Some(name) = &self.display_name {
            profile.display_name = Some(name.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
    }
}

/// Whose orders to list.
#[derive(Debug, Clone, Copy)]
pub enum OrderOwner<'a> {
    User(&'a UserId),
    /// Orders placed before profiles carried a stable uid.
    Email(&'a str),
}

/// A file to put in blob storage.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Object path inside the bucket.
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A fresh document id.
#[must_use]
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Backend facade
// =============================================================================

/// The backend platform, whichever implementation is configured.
#[derive(Clone)]
pub struct Backend {
    kind: BackendKind,
}

#[derive(Clone)]
enum BackendKind {
    Firebase(FirebaseClient),
    Memory(MemoryBackend),
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match &$self.kind {
            BackendKind::Firebase($backend) => $call,
            BackendKind::Memory($backend) => $call,
        }
    };
}

impl From<FirebaseClient> for Backend {
    fn from(client: FirebaseClient) -> Self {
        Self {
            kind: BackendKind::Firebase(client),
        }
    }
}

impl From<MemoryBackend> for Backend {
    fn from(memory: MemoryBackend) -> Self {
        Self {
            kind: BackendKind::Memory(memory),
        }
    }
}

impl Backend {
    /// Create the backend named by the configuration.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        match config {
            BackendConfig::Firebase(firebase) => FirebaseClient::new(firebase).into(),
            BackendConfig::Memory => MemoryBackend::new().into(),
        }
    }

    /// Name shown in logs and on the readiness probe.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self.kind {
            BackendKind::Firebase(_) => "firebase",
            BackendKind::Memory(_) => "memory",
        }
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidCredentials`] for a wrong email or
    /// password.
    #[instrument(skip(self, password), fields(backend = self.name()))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        dispatch!(self, b => b.sign_in(email, password).await)
    }

    /// Exchange the refresh token for a new ID token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::SessionExpired`] if the refresh token is no
    /// longer valid.
    #[instrument(skip_all, fields(uid = %auth.uid))]
    pub async fn refresh(&self, auth: &AuthSession) -> Result<AuthSession, BackendError> {
        dispatch!(self, b => b.refresh(auth).await)
    }

    /// Create an auth account without signing it in here.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::EmailExists`] or [`BackendError::WeakPassword`]
    /// when the auth service refuses the account.
    #[instrument(skip(self, password), fields(backend = self.name()))]
    pub async fn create_account(&self, email: &str, password: &str) -> Result<UserId, BackendError> {
        dispatch!(self, b => b.create_account(email, password).await)
    }

    // -------------------------------------------------------------------------
    // Profiles and credit
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn get_profile(
        &self,
        auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Option<UserProfile>, BackendError> {
        dispatch!(self, b => b.get_profile(auth, uid).await)
    }

    /// Create or overwrite a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(uid = %profile.uid))]
    pub async fn put_profile(
        &self,
        auth: &AuthSession,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        dispatch!(self, b => b.put_profile(auth, profile).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn list_profiles(&self, auth: &AuthSession) -> Result<Vec<UserProfile>, BackendError> {
        dispatch!(self, b => b.list_profiles(auth).await)
    }

    /// Write only the fields set in `patch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn update_profile(
        &self,
        auth: &AuthSession,
        uid: &UserId,
        patch: &ProfilePatch,
    ) -> Result<(), BackendError> {
        if patch.is_empty() {
            return Ok(());
        }
        dispatch!(self, b => b.update_profile(auth, uid, patch).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(uid = %log.user_id, amount = %log.amount))]
    pub async fn add_credit_log(&self, auth: &AuthSession, log: &CreditLog) -> Result<(), BackendError> {
        dispatch!(self, b => b.add_credit_log(auth, log).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn credit_logs_for(
        &self,
        auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Vec<CreditLog>, BackendError> {
        dispatch!(self, b => b.credit_logs_for(auth, uid).await)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        dispatch!(self, b => b.list_products().await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn products_by_creator(&self, uid: &UserId) -> Result<Vec<Product>, BackendError> {
        dispatch!(self, b => b.products_by_creator(uid).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        dispatch!(self, b => b.get_product(id).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub async fn create_product(&self, auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        dispatch!(self, b => b.create_product(auth, product).await)
    }

    /// Write the editable fields of `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub async fn update_product(&self, auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        dispatch!(self, b => b.update_product(auth, product).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn delete_product(&self, auth: &AuthSession, id: &ProductId) -> Result<(), BackendError> {
        dispatch!(self, b => b.delete_product(auth, id).await)
    }

    /// Write the stock, stock history and update time of `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(product_id = %product.id, stock = product.stock))]
    pub async fn update_stock(&self, auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        dispatch!(self, b => b.update_stock(auth, product).await)
    }

    /// Store a file and return its public download URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    #[instrument(skip_all, fields(path = %upload.path, size = upload.bytes.len()))]
    pub async fn upload_image(&self, auth: &AuthSession, upload: &Upload) -> Result<String, BackendError> {
        dispatch!(self, b => b.upload_image(auth, upload).await)
    }

    // -------------------------------------------------------------------------
    // Cart mirror
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(uid = %auth.uid, lines = cart.items.len()))]
    pub async fn save_cart(&self, auth: &AuthSession, cart: &RemoteCart) -> Result<(), BackendError> {
        dispatch!(self, b => b.save_cart(auth, cart).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(uid = %auth.uid))]
    pub async fn load_cart(&self, auth: &AuthSession) -> Result<Option<RemoteCart>, BackendError> {
        dispatch!(self, b => b.load_cart(auth).await)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all, fields(order_id = %order.id, uid = %order.user_id))]
    pub async fn create_order(&self, auth: &AuthSession, order: &Order) -> Result<(), BackendError> {
        dispatch!(self, b => b.create_order(auth, order).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn get_order(&self, auth: &AuthSession, id: &OrderId) -> Result<Option<Order>, BackendError> {
        dispatch!(self, b => b.get_order(auth, id).await)
    }

    /// Every order, for admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn list_orders(&self, auth: &AuthSession) -> Result<Vec<Order>, BackendError> {
        dispatch!(self, b => b.list_orders(auth).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn orders_for(
        &self,
        auth: &AuthSession,
        owner: OrderOwner<'_>,
    ) -> Result<Vec<Order>, BackendError> {
        dispatch!(self, b => b.orders_for(auth, owner).await)
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, auth))]
    pub async fn update_order_status(
        &self,
        auth: &AuthSession,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), BackendError> {
        dispatch!(self, b => b.update_order_status(auth, id, status).await)
    }

    /// Ask the platform to render the invoice PDF and return its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the function call fails.
    #[instrument(skip(self, auth))]
    pub async fn generate_invoice(&self, auth: &AuthSession, id: &OrderId) -> Result<String, BackendError> {
        dispatch!(self, b => b.generate_invoice(auth, id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: i64) -> AuthSession {
        AuthSession::new(
            UserId::new("u1"),
            "a@b.dz".to_owned(),
            "id-token-value".to_owned(),
            "refresh-token-value".to_owned(),
            expires_in,
            Utc::now(),
        )
    }

    #[test]
    fn test_is_expired_uses_buffer() {
        assert!(!session(3600).is_expired(Utc::now()));
        assert!(session(30).is_expired(Utc::now()));
        assert!(session(-10).is_expired(Utc::now()));
    }

    #[test]
    fn test_auth_session_debug_redacts_tokens() {
        let output = format!("{:?}", session(3600));
        assert!(output.contains("a@b.dz"));
        assert!(!output.contains("id-token-value"));
        assert!(!output.contains("refresh-token-value"));
    }

    #[test]
    fn test_profile_patch_applies_set_fields_only() {
        let mut profile = UserProfile::first_sign_in(UserId::new("u1"), "a@b.dz", Utc::now());
        let patch = ProfilePatch {
            status: Some(UserStatus::Suspended),
            phone: Some("0555".to_owned()),
            ..ProfilePatch::default()
        };
        patch.apply(&mut profile);
        assert_eq!(profile.status, UserStatus::Suspended);
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.phone.as_deref(), Some("0555"));
        assert!(ProfilePatch::default().is_empty());
        assert!(!ProfilePatch::credit(Dinars::from_whole(5)).is_empty());
    }

    #[test]
    fn test_document_ids_are_unique() {
        assert_ne!(new_document_id(), new_document_id());
        assert_eq!(new_document_id().len(), 32);
    }
}
