//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Rate limiting on `/api/auth/*` (governor)
//!
//! Authentication is not a layer: handlers opt in through the
//! [`RequireAuth`] and [`RequireAdmin`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AUTH_TOKEN_HEADER, RequireAdmin, RequireAuth};
pub use rate_limit::{ClientIpKeyExtractor, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
