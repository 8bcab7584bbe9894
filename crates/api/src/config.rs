//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RIGSTORE_JWT_SECRET` - Token signing secret (min 32 chars, high entropy).
//!   Falls back to `JWT_SECRET`.
//! - `RIGSTORE_DATABASE_URL` - `PostgreSQL` connection string, when storage is
//!   `postgres`. Falls back to `DATABASE_URL`.
//!
//! ## Optional
//! - `RIGSTORE_STORAGE` - `postgres` (default) or `memory`
//! - `RIGSTORE_HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` / `RIGSTORE_PORT` - Listen port (default: 3000)
//! - `RIGSTORE_TOKEN_TTL_SECS` - Token lifetime; unset means tokens never expire
//! - `RIGSTORE_HASH_TIMEOUT_MS` - Bound on password hashing (default: 5000)
//! - `RIGSTORE_STRICT_ORDER_STATUS` - Forward-only status changes (default: false)
//! - `RIGSTORE_AUTH_RATE_LIMIT` - Rate limit `/api/auth/*` (default: true)
//! - `RIGSTORE_TRUST_PROXY_HEADERS` - Key rate limits on `X-Forwarded-For` /
//!   `X-Real-IP` instead of the peer address (default: false). Only enable
//!   behind a reverse proxy that overwrites these headers.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::models::TransitionPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_HASH_TIMEOUT_MS: u64 = 5000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where state lives.
#[derive(Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres(SecretString),
    /// In-process maps; everything is lost on exit.
    Memory,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.write_str("Postgres([REDACTED])"),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// API server configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ApiConfig {
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// HMAC secret for session tokens
    pub jwt_secret: SecretString,
    /// Token lifetime. `None` issues tokens without an expiry.
    pub token_ttl: Option<Duration>,
    /// Upper bound on one password hash or verification
    pub hash_timeout: Duration,
    /// Which order status changes admins may make
    pub transition_policy: TransitionPolicy,
    /// Whether `/api/auth/*` is rate limited per client IP
    pub auth_rate_limit: bool,
    /// Whether the client IP may be taken from proxy headers
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("storage", &self.storage)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("hash_timeout", &self.hash_timeout)
            .field("transition_policy", &self.transition_policy)
            .field("auth_rate_limit", &self.auth_rate_limit)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = match get_env_or_default("RIGSTORE_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres(get_with_fallback(
                "RIGSTORE_DATABASE_URL",
                "DATABASE_URL",
            )?),
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "RIGSTORE_STORAGE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host = get_env_or_default("RIGSTORE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RIGSTORE_HOST".to_string(), e.to_string()))?;

        // PORT is what most platforms inject; RIGSTORE_PORT wins only when PORT is absent.
        let port = get_optional_env("PORT")
            .or_else(|| get_optional_env("RIGSTORE_PORT"))
            .map_or(Ok(3000), |p| {
                p.parse::<u16>()
                    .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))
            })?;

        let jwt_secret = get_with_fallback("RIGSTORE_JWT_SECRET", "JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "RIGSTORE_JWT_SECRET")?;
        validate_secret_strength(jwt_secret.expose_secret(), "RIGSTORE_JWT_SECRET")?;

        let token_ttl = get_optional_env("RIGSTORE_TOKEN_TTL_SECS")
            .map(|v| parse_u64("RIGSTORE_TOKEN_TTL_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);

        let hash_timeout = Duration::from_millis(parse_u64(
            "RIGSTORE_HASH_TIMEOUT_MS",
            &get_env_or_default("RIGSTORE_HASH_TIMEOUT_MS", &DEFAULT_HASH_TIMEOUT_MS.to_string()),
        )?);

        let strict = parse_bool(
            "RIGSTORE_STRICT_ORDER_STATUS",
            get_optional_env("RIGSTORE_STRICT_ORDER_STATUS"),
            false,
        )?;
        let transition_policy = if strict {
            TransitionPolicy::ForwardOnly
        } else {
            TransitionPolicy::Permissive
        };

        let auth_rate_limit = parse_bool(
            "RIGSTORE_AUTH_RATE_LIMIT",
            get_optional_env("RIGSTORE_AUTH_RATE_LIMIT"),
            true,
        )?;

        let trust_proxy_headers = parse_bool(
            "RIGSTORE_TRUST_PROXY_HEADERS",
            get_optional_env("RIGSTORE_TRUST_PROXY_HEADERS"),
            false,
        )?;

        Ok(Self {
            storage,
            host,
            port,
            jwt_secret,
            token_ttl,
            hash_timeout,
            transition_policy,
            auth_rate_limit,
            trust_proxy_headers,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// In-memory configuration with defaults, for tests and local tooling.
    ///
    /// Binds to `127.0.0.1:0` and disables rate limiting.
    #[must_use]
    pub fn in_memory(jwt_secret: SecretString) -> Self {
        Self {
            storage: StorageConfig::Memory,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            jwt_secret,
            token_ttl: None,
            hash_timeout: Duration::from_millis(DEFAULT_HASH_TIMEOUT_MS),
            transition_policy: TransitionPolicy::Permissive,
            auth_rate_limit: false,
            trust_proxy_headers: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required secret, trying `primary` then `fallback`.
fn get_with_fallback(primary: &str, fallback: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
