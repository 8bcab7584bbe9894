//! Rate limiting for authentication endpoints using governor and `tower_governor`.
//!
//! Limits are keyed on the TCP peer address. Proxy headers are only consulted
//! when `RIGSTORE_TRUST_PROXY_HEADERS` is set, since any client can send them.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    /// Key on the peer address only.
    #[must_use]
    pub const fn peer() -> Self {
        Self {
            trust_proxy_headers: false,
        }
    }

    /// Prefer `X-Forwarded-For` / `X-Real-IP`, falling back to the peer.
    #[must_use]
    pub const fn behind_proxy() -> Self {
        Self {
            trust_proxy_headers: true,
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For (first IP in the chain)
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if self.trust_proxy_headers
            && let Some(ip) = forwarded_ip(req.headers())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(6)` and `burst_size(5)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(key_extractor: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key_extractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(forwarded_for: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/api/auth/login");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 40_000))));
        req
    }

    #[test]
    fn test_peer_ignores_forwarded_headers() {
        let key = ClientIpKeyExtractor::peer()
            .extract(&request(Some("10.0.0.1")))
            .unwrap();
        assert_eq!(key, IpAddr::from([192, 0, 2, 7]));
    }

    #[test]
    fn test_behind_proxy_uses_first_forwarded_ip() {
        let extractor = ClientIpKeyExtractor::behind_proxy();

        let key = extractor
            .extract(&request(Some("10.0.0.1, 172.16.0.1")))
            .unwrap();
        assert_eq!(key, IpAddr::from([10, 0, 0, 1]));

        let key = extractor.extract(&request(Some("garbage"))).unwrap();
        assert_eq!(key, IpAddr::from([192, 0, 2, 7]));
    }

    #[test]
    fn test_missing_peer_is_an_error() {
        let req = Request::builder().body(()).unwrap();
        assert!(ClientIpKeyExtractor::peer().extract(&req).is_err());
    }
}
