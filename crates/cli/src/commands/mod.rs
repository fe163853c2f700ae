//! Command implementations.
//!
//! Every command signs in to the Firebase project as an admin account and
//! goes through the same services the storefront uses, so the security
//! rules see the same writes.
//!
//! # Environment Variables
//!
//! - `FIREBASE_PROJECT_ID`, `FIREBASE_API_KEY` - the project to talk to
//! - `GW_ADMIN_EMAIL` - email of an active admin account
//! - `GW_ADMIN_PASSWORD` - its password

pub mod credit;
pub mod orders;
pub mod seed;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

use gamewar_core::{Access, UserId, UserProfile};
use gamewar_storefront::backend::{AuthSession, Backend, BackendError};
use gamewar_storefront::config::{BackendConfig, ConfigError, FirebaseConfig};
use gamewar_storefront::error::AppError;
use gamewar_storefront::services::{BackOffice, CatalogService, OrderService, ProfileResolver};

/// Errors shared by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    App(#[from] AppError),

    /// The signed-in account is not an active admin.
    #[error("{0} is not an active admin account")]
    NotAdmin(String),

    /// No profile matches the given uid or email.
    #[error("No user matches: {0}")]
    UnknownUser(String),
}

/// An admin signed in to the backend.
pub struct AdminSession {
    backend: Backend,
    profiles: ProfileResolver,
    catalog: CatalogService,
    auth: AuthSession,
    access: Access,
}

impl AdminSession {
    /// Sign in with `GW_ADMIN_EMAIL` / `GW_ADMIN_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is incomplete, the sign-in is
    /// refused, or the account is not an active admin.
    pub async fn connect() -> Result<Self, CommandError> {
        dotenvy::dotenv().ok();

        let email = std::env::var("GW_ADMIN_EMAIL")
            .map_err(|_| CommandError::MissingEnvVar("GW_ADMIN_EMAIL"))?;
        let password = std::env::var("GW_ADMIN_PASSWORD")
            .map(SecretString::from)
            .map_err(|_| CommandError::MissingEnvVar("GW_ADMIN_PASSWORD"))?;

        let backend =
            Backend::from_config(&BackendConfig::Firebase(FirebaseConfig::from_env()?));
        Self::sign_in(backend, email.trim(), &password).await
    }

    /// Sign in against an existing backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the sign-in is refused or the account is not an
    /// active admin.
    pub async fn sign_in(
        backend: Backend,
        email: &str,
        password: &SecretString,
    ) -> Result<Self, CommandError> {
        let auth = backend.sign_in(email, password.expose_secret()).await?;
        let profiles = ProfileResolver::new(backend.clone());
        let profile = profiles.resolve(&auth).await?;
        let access = Access::derive(Some(&profile));
        if !access.is_admin || !access.is_active {
            return Err(CommandError::NotAdmin(auth.email));
        }

        info!(uid = %auth.uid, backend = backend.name(), "Signed in as admin");
        Ok(Self {
            catalog: CatalogService::new(backend.clone()),
            profiles,
            backend,
            auth,
            access,
        })
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthSession {
        &self.auth
    }

    #[must_use]
    pub const fn access(&self) -> &Access {
        &self.access
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    #[must_use]
    pub const fn back_office(&self) -> BackOffice<'_> {
        BackOffice::new(&self.backend, &self.profiles, &self.catalog)
    }

    #[must_use]
    pub const fn orders(&self) -> OrderService<'_> {
        OrderService::new(&self.backend)
    }

    /// Find an account by uid, or by email when the argument has an `@`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` when no profile has that email.
    pub async fn find_user(&self, user: &str) -> Result<UserProfile, CommandError> {
        let users = self.back_office().users(&self.auth).await?;
        let found = if user.contains('@') {
            users
                .into_iter()
                .find(|p| p.email.eq_ignore_ascii_case(user.trim()))
        } else {
            let uid = UserId::new(user.trim());
            users.into_iter().find(|p| p.uid == uid)
        };
        found.ok_or_else(|| CommandError::UnknownUser(user.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use chrono::Utc;
    use secrecy::SecretString;

    use gamewar_core::{Dinars, UserId, UserProfile, UserRole, UserStatus};
    use gamewar_storefront::backend::{Backend, MemoryBackend};

    use super::AdminSession;

    pub const ADMIN_EMAIL: &str = "admin@gamewar.dz";
    pub const CUSTOMER_EMAIL: &str = "client@gamewar.dz";
    pub const PASSWORD: &str = "secret-pass";

    /// A memory backend with an active admin and a pending customer.
    pub async fn seeded() -> (MemoryBackend, AdminSession) {
        let memory = MemoryBackend::new();
        memory
            .add_account(
                ADMIN_EMAIL,
                PASSWORD,
                Some(profile("admin-uid", ADMIN_EMAIL, UserRole::Admin, UserStatus::Active)),
            )
            .await;
        memory
            .add_account(
                CUSTOMER_EMAIL,
                PASSWORD,
                Some(profile("client-uid", CUSTOMER_EMAIL, UserRole::User, UserStatus::Pending)),
            )
            .await;

        let session = AdminSession::sign_in(
            Backend::from(memory.clone()),
            ADMIN_EMAIL,
            &SecretString::from(PASSWORD),
        )
        .await
        .unwrap();
        (memory, session)
    }

    pub fn profile(uid: &str, email: &str, role: UserRole, status: UserStatus) -> UserProfile {
        UserProfile {
            uid: UserId::new(uid),
            email: email.to_owned(),
            role,
            status,
            credit: Dinars::ZERO,
            created_at: Utc::now(),
            display_name: None,
            phone: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use gamewar_core::{UserRole, UserStatus};
    use gamewar_storefront::backend::{Backend, MemoryBackend};

    use super::test_support::{self, CUSTOMER_EMAIL, PASSWORD};
    use super::*;

    #[tokio::test]
    async fn test_sign_in_refuses_non_admin() {
        let memory = MemoryBackend::new();
        memory
            .add_account(
                CUSTOMER_EMAIL,
                PASSWORD,
                Some(test_support::profile("c", CUSTOMER_EMAIL, UserRole::Seller, UserStatus::Active)),
            )
            .await;

        let result = AdminSession::sign_in(
            Backend::from(memory),
            CUSTOMER_EMAIL,
            &SecretString::from(PASSWORD),
        )
        .await;
        assert!(matches!(result, Err(CommandError::NotAdmin(_))));
    }

    #[tokio::test]
    async fn test_find_user_by_email_or_uid() {
        let (_, session) = test_support::seeded().await;

        let by_email = session.find_user("CLIENT@gamewar.dz").await.unwrap();
        assert_eq!(by_email.uid, UserId::new("client-uid"));

        let by_uid = session.find_user("client-uid").await.unwrap();
        assert_eq!(by_uid.email, CUSTOMER_EMAIL);

        assert!(matches!(
            session.find_user("nobody@gamewar.dz").await,
            Err(CommandError::UnknownUser(_))
        ));
    }
}
