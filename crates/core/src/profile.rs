//! User profiles and the access rules derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

use crate::types::{Dinars, UserId, UserRole, UserStatus};

/// Credit given to a new account, and assumed for stored profiles that have
/// no credit field.
pub const DEFAULT_CREDIT: Dinars = Dinars::new(Decimal::ONE_HUNDRED);

/// The stored `users/{uid}` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub credit: Dinars,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

impl UserProfile {
    /// The profile created the first time an account signs in without one.
    #[must_use]
    pub fn first_sign_in(uid: UserId, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uid,
            email: email.into(),
            role: UserRole::User,
            status: UserStatus::Active,
            credit: DEFAULT_CREDIT,
            created_at: now,
            display_name: None,
            phone: None,
        }
    }

    /// Name shown in the navbar and on admin screens.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Role flags for the current visitor.
///
/// A signed-in account whose profile could not be loaded counts as a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Access {
    pub is_guest: bool,
    pub is_user: bool,
    pub is_seller: bool,
    pub is_admin: bool,
    pub is_active: bool,
    pub can_see_prices: bool,
}

impl Access {
    #[must_use]
    pub fn derive(profile: Option<&UserProfile>) -> Self {
        let Some(profile) = profile else {
            return Self {
                is_guest: true,
                ..Self::default()
            };
        };

        let is_active = profile.status == UserStatus::Active;
        Self {
            is_guest: false,
            is_user: profile.role == UserRole::User,
            is_seller: profile.role == UserRole::Seller,
            is_admin: profile.role == UserRole::Admin,
            is_active,
            can_see_prices: is_active,
        }
    }

    /// Evaluate a route guard.
    ///
    /// `signed_in` is whether an auth session exists, which can be true even
    /// when no profile was resolved.
    ///
    /// # Errors
    ///
    /// Returns the [`Denial`] for the first requirement that fails, checked in
    /// the order auth, active, admin, seller.
    pub const fn check(&self, signed_in: bool, req: Requirement) -> Result<(), Denial> {
        if req.auth && !signed_in {
            return Err(Denial::Login);
        }
        if req.active && !self.is_active {
            return Err(Denial::Home);
        }
        if req.admin && !self.is_admin {
            return Err(Denial::Home);
        }
        if req.seller && !self.is_seller && !self.is_admin {
            return Err(Denial::Home);
        }
        Ok(())
    }
}

/// What a route demands of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Requirement {
    pub auth: bool,
    pub active: bool,
    pub admin: bool,
    pub seller: bool,
}

impl Requirement {
    /// Cart and orders.
    pub const ACTIVE_USER: Self = Self {
        auth: true,
        active: true,
        admin: false,
        seller: false,
    };

    pub const ADMIN: Self = Self {
        auth: true,
        active: true,
        admin: true,
        seller: false,
    };

    /// Sellers, and admins acting as sellers.
    pub const SELLER: Self = Self {
        auth: true,
        active: true,
        admin: false,
        seller: true,
    };
}

/// Where a rejected visitor is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Login,
    Home,
}

impl Denial {
    #[must_use]
    pub const fn redirect_path(self) -> &'static str {
        match self {
            Self::Login => "/auth/login",
            Self::Home => "/",
        }
    }
}
