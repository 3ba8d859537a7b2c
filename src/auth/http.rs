//! HTTP-based token provider.
//!
//! Fetches Graph access tokens from a token service that holds the OAuth
//! refresh tokens on behalf of users. Tokens are cached and refreshed shortly
//! before they expire.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Instant;
use tracing::debug;

use super::TokenProvider;

/// Refresh this many seconds before the reported expiry.
const EXPIRY_BUFFER_SECS: u64 = 60;

/// Assumed lifetime when the service omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Response structure from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token expiry in seconds from now
    expires_in: Option<u64>,
}

/// Cached token with expiry tracking.
struct CachedToken {
    token: String,
    fetched_at: Instant,
    expires_in_secs: u64,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        let usable_for = self.expires_in_secs.saturating_sub(EXPIRY_BUFFER_SECS);
        self.fetched_at.elapsed().as_secs() < usable_for
    }
}

/// Configuration for the HTTP token provider.
#[derive(Debug, Clone)]
pub struct HttpTokenProviderConfig {
    /// The HTTP endpoint to fetch tokens from.
    pub endpoint: String,
    /// HTTP method (GET, POST, etc.).
    pub method: String,
    /// HTTP headers to send with the request.
    pub headers: HashMap<String, String>,
}

/// A token provider backed by an HTTP token service.
pub struct HttpTokenProvider {
    config: HttpTokenProviderConfig,
    client: reqwest::Client,
    cached_token: RwLock<Option<CachedToken>>,
}

impl HttpTokenProvider {
    /// Create a new HTTP token provider.
    pub fn new(config: HttpTokenProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cached_token: RwLock::new(None),
        }
    }

    fn cached(&self) -> Option<String> {
        self.cached_token
            .read()
            .as_ref()
            .filter(|cached| cached.is_fresh())
            .map(|cached| cached.token.clone())
    }

    /// Fetch a fresh token from the endpoint.
    async fn fetch_token(&self) -> Result<TokenResponse, Box<dyn StdError + Send + Sync>> {
        let method = reqwest::Method::from_bytes(self.config.method.as_bytes())
            .map_err(|_| format!("Invalid HTTP method: {}", self.config.method))?;

        let mut request = self.client.request(method, &self.config.endpoint);
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        debug!("fetching access token from {}", self.config.endpoint);
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Token endpoint returned error {}: {}", status, body).into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn get_token(&self) -> Result<String, Box<dyn StdError + Send + Sync>> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let fetched = self.fetch_token().await?;
        let token = fetched.access_token;

        *self.cached_token.write() = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
            expires_in_secs: fetched.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        });

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn provider() -> HttpTokenProvider {
        HttpTokenProvider::new(HttpTokenProviderConfig {
            endpoint: "http://127.0.0.1:9/token".to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
        })
    }

    #[test]
    fn test_new_token_is_fresh() {
        let cached = CachedToken {
            token: "t".to_string(),
            fetched_at: Instant::now(),
            expires_in_secs: 3600,
        };
        assert!(cached.is_fresh());
    }

    #[test]
    fn test_token_inside_buffer_is_stale() {
        let cached = CachedToken {
            token: "t".to_string(),
            fetched_at: Instant::now() - Duration::from_secs(3600 - EXPIRY_BUFFER_SECS),
            expires_in_secs: 3600,
        };
        assert!(!cached.is_fresh());
    }

    #[test]
    fn test_short_lived_token_never_fresh() {
        let cached = CachedToken {
            token: "t".to_string(),
            fetched_at: Instant::now(),
            expires_in_secs: EXPIRY_BUFFER_SECS / 2,
        };
        assert!(!cached.is_fresh());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let provider = provider();
        *provider.cached_token.write() = Some(CachedToken {
            token: "cached".to_string(),
            fetched_at: Instant::now(),
            expires_in_secs: 3600,
        });
        assert_eq!(provider.get_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_invalid_method_is_an_error() {
        let provider = HttpTokenProvider::new(HttpTokenProviderConfig {
            endpoint: "http://127.0.0.1:9/token".to_string(),
            method: "NOT A METHOD".to_string(),
            headers: HashMap::new(),
        });
        let err = provider.get_token().await.unwrap_err();
        assert!(err.to_string().contains("Invalid HTTP method"));
    }
}
