//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two policies, both keyed by client IP:
//! - [`AUTH_POLICY`]: register and login (~10/min, burst 5)
//! - [`API_POLICY`]: everything else (~100/min, burst 50)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers checked for the client IP, in order.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "fly-client-ip"];

/// Key extractor that prefers proxy headers and falls back to the socket
/// peer address recorded by `into_make_service_with_connect_info`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Client IP from proxy headers. For `X-Forwarded-For` the first entry wins.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

/// Token bucket settings for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Seconds to replenish one request.
    pub replenish_secs: u64,
    /// Requests allowed in a burst.
    pub burst: u32,
}

/// Auth endpoints: 1 request every 6 seconds, burst of 5.
pub const AUTH_POLICY: RateLimitPolicy = RateLimitPolicy {
    replenish_secs: 6,
    burst: 5,
};

/// General API: 1 request per second, burst of 50.
pub const API_POLICY: RateLimitPolicy = RateLimitPolicy {
    replenish_secs: 1,
    burst: 50,
};

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build a limiter layer for a policy.
///
/// # Panics
///
/// Panics if `replenish_secs` or `burst` is zero. Both built-in policies use
/// positive values.
#[must_use]
pub fn rate_limiter(policy: RateLimitPolicy) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(policy.replenish_secs)
        .burst_size(policy.burst)
        .finish()
        .expect("rate limit policy has positive replenish period and burst size");
    GovernorLayer::new(Arc::new(config))
}

/// Limiter for register and login.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    rate_limiter(AUTH_POLICY)
}

/// Limiter for the rest of the API.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    rate_limiter(API_POLICY)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tower_governor::key_extractor::KeyExtractor;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/products");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_header_precedence() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );

        let req = request(&[("x-forwarded-for", "10.0.0.1, 10.0.0.2")]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).unwrap(),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );

        let req = request(&[("fly-client-ip", "2001:db8::1")]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut req = request(&[("x-real-ip", "not-an-ip")]);
        let peer: SocketAddr = "192.0.2.10:51234".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ClientIpKeyExtractor.extract(&req).unwrap(), peer.ip());
    }

    #[test]
    fn test_no_key() {
        assert!(ClientIpKeyExtractor.extract(&request(&[])).is_err());
    }
}
