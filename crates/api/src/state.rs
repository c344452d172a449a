//! Application state shared across handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::config::ApiConfig;
use crate::content::BlogStore;
use crate::db::Store;
use crate::services::token::TokenService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store, token service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    tokens: TokenService,
    blog: BlogStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Persistence backend
    /// * `blog` - Blog posts loaded at startup
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, blog: BlogStore) -> Self {
        let tokens = TokenService::new(
            config.jwt_secret.clone(),
            Duration::hours(config.token_ttl_hours),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                blog,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the loaded blog posts.
    #[must_use]
    pub fn blog(&self) -> &BlogStore {
        &self.inner.blog
    }
}
