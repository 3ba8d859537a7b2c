//! Remote-call executor for the Graph API
//!
//! The drive operations never talk to `reqwest` directly. They build a
//! [`GraphRequest`] and hand it to a [`GraphClient`], which is injected at
//! construction. This keeps request construction testable without a network
//! and lets callers swap the transport.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{AdapterError, Result};

pub use http::HttpGraphClient;

/// Body attached to a request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
}

/// A single call against the Graph API.
///
/// `endpoint` is either relative to the API base (`/me/drive/root:/a.txt`)
/// or an absolute URL such as an upload session URL.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub method: Method,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl GraphRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, body: Bytes) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the endpoint is a full URL rather than an API-relative path
    pub fn is_absolute(&self) -> bool {
        self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")
    }
}

/// Successful response from the Graph API
#[derive(Debug, Clone)]
pub struct GraphResponse {
    pub status: u16,
    pub body: Bytes,
}

impl GraphResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(AdapterError::MalformedResponse(format!(
                "empty body with status {}",
                self.status
            )));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Executes requests against the remote API.
///
/// Implementations return `Err` for transport failures and for any non-2xx
/// status; a 404 is reported as [`AdapterError::NotFound`].
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Execute a request and buffer the response body
    async fn execute(&self, request: GraphRequest) -> Result<GraphResponse>;

    /// Execute a request and stream the response body into `sink`.
    ///
    /// Returns the number of bytes written. The default implementation
    /// buffers through [`GraphClient::execute`].
    async fn download(
        &self,
        request: GraphRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        let response = self.execute(request).await?;
        sink.write_all(&response.body).await?;
        sink.flush().await?;
        Ok(response.body.len() as u64)
    }
}
