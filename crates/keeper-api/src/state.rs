//! # Application State
//!
//! Shared state for the Axum application, passed to handlers and the auth
//! gate via the `State` extractor. Everything in it is built once at
//! startup and only read afterwards; cloning is a handful of `Arc` bumps.

use std::sync::Arc;

use keeper_auth::{AuthError, TokenVerifier};
use keeper_storage::ObjectStore;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub store: Arc<dyn ObjectStore>,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("store", &self.store.backend_name())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl AppState {
    /// Build state from configuration and an already-connected store.
    ///
    /// Parses the configured public key once; every request reuses the
    /// resulting verifier.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyFormat`] if `JWT_PUBLIC_KEY` is not a PEM RSA public key.
    pub fn new(config: AppConfig, store: Arc<dyn ObjectStore>) -> Result<Self, AuthError> {
        let verifier = TokenVerifier::from_pem(&config.jwt_public_key)?;
        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            store,
            metrics: ApiMetrics::new(),
        })
    }
}
