//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (store ping)
//!
//! # Auth (rate limited)
//! POST /api/auth/register         - Create customer account, returns token
//! POST /api/auth/login            - Exchange credentials for token
//! GET  /api/auth/me               - Identity carried by the presented token
//!
//! # Catalog
//! GET    /api/products            - List (?cat=&sort=asc|desc)
//! GET    /api/products/{id}       - Detail
//! POST   /api/products            - Create (admin)
//! DELETE /api/products/{id}       - Delete (admin, idempotent)
//! PUT    /api/products/{id}/review - Append review (auth)
//!
//! # Orders
//! POST /api/orders                - Place order (auth)
//! GET  /api/orders                - All orders (admin)
//! GET  /api/orders/mine           - Caller's orders (auth)
//! PUT  /api/orders/{id}           - Set status (admin)
//!
//! # Stats
//! GET  /api/stats/revenue         - Revenue by category (admin, ?status=)
//! ```

pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod stats;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    http::{HeaderName, Method, header},
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::middleware::{
    AUTH_TOKEN_HEADER, ClientIpKeyExtractor, auth_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show).delete(products::delete))
        .route("/{id}/review", put(products::review))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/mine", get(orders::mine))
        .route("/{id}", put(orders::update_status))
}

/// Create the stats routes router.
pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/revenue", get(stats::revenue))
}

/// Create all API routes.
pub fn routes(config: &ApiConfig) -> Router<AppState> {
    let mut auth = auth_routes();
    if config.auth_rate_limit {
        let key = if config.trust_proxy_headers {
            ClientIpKeyExtractor::behind_proxy()
        } else {
            ClientIpKeyExtractor::peer()
        };
        auth = auth.layer(auth_rate_limiter(key));
    }

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth)
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/stats", stats_routes())
}

/// Assemble the full application: routes, middleware stack, and state.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(AUTH_TOKEN_HEADER),
        ]);

    routes(state.config())
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
