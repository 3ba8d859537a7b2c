//! Static token provider for tests and pre-obtained tokens.
//!
//! Graph access tokens typically live for about an hour and this provider
//! never refreshes, so it suits short runs only.

use async_trait::async_trait;
use std::error::Error as StdError;

use super::TokenProvider;

/// A token provider that always returns the same bearer token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Create a new static token provider.
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<String, Box<dyn StdError + Send + Sync>> {
        Ok(self.token.clone())
    }
}
