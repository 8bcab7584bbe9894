//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::DynStore;
use crate::services::auth::{AuthService, TokenKeys};
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderCoordinator;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the storage backend and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: DynStore,
    tokens: TokenKeys,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, store: DynStore) -> Self {
        let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &DynStore {
        &self.inner.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Credential Service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.store.as_ref(),
            &self.inner.tokens,
            self.inner.config.hash_timeout,
        )
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.inner.store.as_ref())
    }

    #[must_use]
    pub fn orders(&self) -> OrderCoordinator<'_> {
        OrderCoordinator::new(
            self.inner.store.as_ref(),
            self.inner.config.transition_policy,
        )
    }
}
