//! Session layer configuration.
//!
//! Sessions are kept in process memory. A restart signs everybody out and
//! drops guest carts; signed-in carts come back from the remote mirror on the
//! next sign-in.
//!
//! The session cookie is signed with a key derived from
//! `GAMEWAR_SESSION_SECRET`, so a tampered id is treated as no session.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "gw_session";

/// Seven days without a request.
const SESSION_INACTIVITY_DAYS: i64 = 7;

/// Cookie signing key: the SHA-512 of the session secret, which gives the
/// 64 bytes the key needs.
fn signing_key(config: &StorefrontConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

#[must_use]
pub fn create_session_layer(
    config: &StorefrontConfig,
) -> SessionManagerLayer<MemoryStore, SignedCookie> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::BackendConfig;

    fn config(secret: &str) -> StorefrontConfig {
        StorefrontConfig {
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://127.0.0.1".to_owned(),
            session_secret: SecretString::from(secret.to_owned()),
            backend: BackendConfig::Memory,
            whatsapp_number: String::new(),
            sentry_dsn: None,
            sentry_environment: "test".to_owned(),
        }
    }

    #[test]
    fn test_signing_key_follows_secret() {
        let a = signing_key(&config("k8#Qz2!vN5@pL9$wR3^tY7&uE1*oA6(s"));
        let b = signing_key(&config("k8#Qz2!vN5@pL9$wR3^tY7&uE1*oA6(s"));
        let c = signing_key(&config("Zp4!mW8@qR2#tV6$yB1%nC5^xL9&dF3*"));
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
