//! Credential provider for the upstream catalog API.
//!
//! The status client treats authentication as an opaque collaborator: it asks
//! for a bearer token before each attempt and requests a refresh exactly once
//! per fetch when the upstream signals an auth failure.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::FetchError;

/// Supplies bearer tokens for upstream requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a token believed to be valid.
    async fn token(&self) -> Result<String, FetchError>;

    /// Force-refresh the cached token after an auth failure.
    async fn refresh(&self) -> Result<String, FetchError>;
}

/// Token provider backed by a fixed token.
///
/// Covers deployments where an external sidecar keeps the token fresh, and
/// all tests. `refresh` simply re-reads the stored value.
pub struct StaticTokenProvider {
    token: RwLock<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(token.into()),
        }
    }

    /// Replace the stored token (e.g. from a rotation hook).
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = token.into();
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, FetchError> {
        let token = self.token.read().await;
        if token.is_empty() {
            return Err(FetchError::Auth("no API token configured".to_string()));
        }
        Ok(token.clone())
    }

    async fn refresh(&self) -> Result<String, FetchError> {
        self.token().await
    }
}
