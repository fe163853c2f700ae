//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the sign-in form is limited: every attempt there is a password
//! check against the auth service, which locks accounts on its own after
//! repeated failures.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP behind a proxy
// =============================================================================

/// Key extractor reading the client IP from proxy headers.
///
/// `CF-Connecting-IP` wins, then the first `X-Forwarded-For` hop, then
/// `X-Real-IP`. Requests carrying none of them are rejected.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

/// Headers holding the client IP, most trusted first.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        CLIENT_IP_HEADERS
            .iter()
            .filter_map(|name| req.headers().get(*name))
            .filter_map(|value| value.to_str().ok())
            // X-Forwarded-For lists every hop; the client is the first.
            .filter_map(|value| value.split(',').next())
            .find_map(|ip| ip.trim().parse::<IpAddr>().ok())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
///
/// Keyed by [`ProxyIpKeyExtractor`].
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Limiter for the sign-in form: a burst of 5, then one attempt every
/// 6 seconds per IP.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_prefers_cloudflare_header() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("cf-connecting-ip", "41.200.1.1"),
        ]);
        let ip = ProxyIpKeyExtractor.extract(&req).ok();
        assert_eq!(ip, "41.200.1.1".parse().ok());
    }

    #[test]
    fn test_first_forwarded_hop() {
        let req = request(&[("x-forwarded-for", "105.98.0.7, 10.0.0.2")]);
        assert_eq!(ProxyIpKeyExtractor.extract(&req).ok(), "105.98.0.7".parse().ok());
    }

    #[test]
    fn test_missing_headers_rejected() {
        assert!(ProxyIpKeyExtractor.extract(&request(&[])).is_err());
    }
}
