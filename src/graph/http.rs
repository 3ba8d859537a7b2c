//! `reqwest`-backed Graph client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::{GraphClient, GraphRequest, GraphResponse, RequestBody};
use crate::auth::TokenProvider;
use crate::config::DriveConfig;
use crate::error::{AdapterError, Result};

/// Graph client over HTTPS.
///
/// Relative endpoints are joined to the API base. Absolute URLs are sent
/// as-is. Only URLs under the API base carry the bearer token; upload session
/// URLs point elsewhere, are pre-authenticated and must not receive it.
pub struct HttpGraphClient {
    client: reqwest::Client,
    api_base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpGraphClient {
    /// Create a client for `api_base`, e.g. `https://graph.microsoft.com/v1.0`
    pub fn new(
        api_base: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("onedrive-adapter/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AdapterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Create a client from resolved drive configuration
    pub fn from_config(config: &DriveConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::new(config.api_base.clone(), tokens, config.timeout)
    }

    fn url_for(&self, request: &GraphRequest) -> String {
        if request.is_absolute() {
            request.endpoint.clone()
        } else {
            format!("{}{}", self.api_base, request.endpoint)
        }
    }

    fn needs_token(&self, url: &str) -> bool {
        url.starts_with(&self.api_base)
    }

    async fn send(&self, request: GraphRequest) -> Result<reqwest::Response> {
        let url = self.url_for(&request);
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);

        if self.needs_token(&url) {
            let token = self
                .tokens
                .get_token()
                .await
                .map_err(|e| AdapterError::Auth(e.to_string()))?;
            builder = builder.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status();
        trace!("{} -> {}", url, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::from_status(status.as_u16(), &request.endpoint, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl GraphClient for HttpGraphClient {
    async fn execute(&self, request: GraphRequest) -> Result<GraphResponse> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(GraphResponse { status, body })
    }

    async fn download(
        &self,
        request: GraphRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        let mut response = self.send(request).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}
