//! Token providers for Graph API authentication
//!
//! Token acquisition sits outside the adapter; the HTTP executor only asks a
//! provider for a bearer token before each API call. Two sources exist:
//! - Static tokens (tests, short-lived scripts)
//! - HTTP token services that broker OAuth tokens for users

pub mod http;
pub mod static_token;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

pub use http::{HttpTokenProvider, HttpTokenProviderConfig};
pub use static_token::StaticTokenProvider;

use crate::config::AuthConfig;

/// Source of bearer tokens for the Graph API.
///
/// Implementations must be cheap to call repeatedly; caching and refresh are
/// their own concern.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a bearer token valid for at least the next request.
    async fn get_token(&self) -> Result<String, Box<dyn StdError + Send + Sync>>;
}

/// Build the provider described by `config`.
pub fn provider_from_config(config: &AuthConfig) -> Arc<dyn TokenProvider> {
    match config {
        AuthConfig::Static { token } => Arc::new(StaticTokenProvider::new(token.clone())),
        AuthConfig::Http {
            endpoint,
            method,
            headers,
        } => Arc::new(HttpTokenProvider::new(HttpTokenProviderConfig {
            endpoint: endpoint.clone(),
            method: method.clone(),
            headers: headers.clone(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_config_builds_static_provider() {
        let provider = provider_from_config(&AuthConfig::Static {
            token: "abc".to_string(),
        });
        assert_eq!(provider.get_token().await.unwrap(), "abc");
    }
}
