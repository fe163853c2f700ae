//! Session-related types.
//!
//! The session lives server-side; the cookie only carries its id. It holds
//! the account tokens, the cart, the interface language and at most one
//! pending flash message.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// [`AuthSession`](crate::backend::AuthSession) of the signed-in account.
    pub const AUTH: &str = "auth";

    /// The visitor [`Cart`](gamewar_core::Cart).
    pub const CART: &str = "cart";

    /// Selected [`Language`](gamewar_core::Language).
    pub const LANG: &str = "lang";

    /// Pending [`Flash`](super::Flash) message.
    pub const FLASH: &str = "flash";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Warning,
    Error,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Warning => "flash-warning",
            Self::Error => "flash-error",
        }
    }
}

/// A one-shot notice shown on the next rendered page.
///
/// `key` is a translation key, so the message follows the language the next
/// page is rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub key: String,
}

impl Flash {
    #[must_use]
    pub fn success(key: &str) -> Self {
        Self {
            kind: FlashKind::Success,
            key: key.to_owned(),
        }
    }

    #[must_use]
    pub fn warning(key: &str) -> Self {
        Self {
            kind: FlashKind::Warning,
            key: key.to_owned(),
        }
    }

    #[must_use]
    pub fn error(key: &str) -> Self {
        Self {
            kind: FlashKind::Error,
            key: key.to_owned(),
        }
    }

    /// Queue this message for the next page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn push(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::FLASH, self).await
    }

    /// Take the pending message, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn take(session: &Session) -> Result<Option<Self>, tower_sessions::session::Error> {
        session.remove(keys::FLASH).await
    }
}
