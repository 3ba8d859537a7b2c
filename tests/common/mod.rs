//! Common test utilities and fixtures
//!
//! [`MockGraphClient`] answers requests from a script, in order, and records
//! every request it sees. Request bodies made of raw bytes are recorded by
//! length only, so multi-megabyte uploads stay cheap to inspect.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, ReadBuf};

use onedrive_adapter::drive::path::{Addressing, PathTranslator};
use onedrive_adapter::drive::Drive;
use onedrive_adapter::graph::{GraphClient, GraphRequest, GraphResponse, RequestBody};
use onedrive_adapter::{AdapterError, OneDriveAdapter, Result};

pub const UPLOAD_URL: &str = "https://upload.example.com/rup/session-1";

/// What the mock saw for one request
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub body_len: usize,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Scripted, request-recording Graph client
#[derive(Default)]
pub struct MockGraphClient {
    script: Mutex<VecDeque<Result<GraphResponse>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockGraphClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a JSON response
    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .push_back(Ok(GraphResponse::new(status, body.to_string())));
        self
    }

    /// Queue a raw response body
    pub fn respond_bytes(&self, status: u16, body: &'static [u8]) -> &Self {
        self.script
            .lock()
            .push_back(Ok(GraphResponse::new(status, body)));
        self
    }

    /// Queue a failure
    pub fn fail(&self, error: AdapterError) -> &Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl GraphClient for MockGraphClient {
    async fn execute(&self, request: GraphRequest) -> Result<GraphResponse> {
        let (json, body_len) = match &request.body {
            RequestBody::Empty => (None, 0),
            RequestBody::Json(value) => (Some(value.clone()), value.to_string().len()),
            RequestBody::Bytes(bytes) => (None, bytes.len()),
        };
        self.requests.lock().push(Recorded {
            method: request.method.clone(),
            endpoint: request.endpoint.clone(),
            headers: request.headers.clone(),
            json,
            body_len,
        });

        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(AdapterError::Transport(format!(
                "no scripted response for {} {}",
                request.method, request.endpoint
            )))
        })
    }
}

/// Drive rooted at `/me/drive/root` with default settings
pub fn path_drive(mock: &Arc<MockGraphClient>) -> Drive {
    let paths = PathTranslator::new("/me/drive/", "root", Addressing::Path);
    Drive::new(mock.clone(), paths)
}

pub fn path_adapter(mock: &Arc<MockGraphClient>) -> OneDriveAdapter {
    OneDriveAdapter::new(path_drive(mock))
}

/// A file item as the remote returns it
pub fn file_item(name: &str, size: u64) -> Value {
    json!({
        "id": format!("id-{}", name),
        "name": name,
        "size": size,
        "lastModifiedDateTime": "2024-03-01T12:00:00Z",
        "file": {"mimeType": "application/octet-stream"},
        "webUrl": format!("https://onedrive.live.com/{}", name),
    })
}

/// A folder item as the remote returns it
pub fn folder_item(name: &str) -> Value {
    json!({
        "id": format!("id-{}", name),
        "name": name,
        "size": 0,
        "folder": {"childCount": 1},
    })
}

pub fn page(items: Vec<Value>) -> Value {
    json!({ "value": items })
}

/// Reader that yields `prefix` and then fails
pub struct FailingReader {
    prefix: &'static [u8],
    sent: bool,
}

impl FailingReader {
    pub fn new(prefix: &'static [u8]) -> Self {
        Self {
            prefix,
            sent: false,
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "source went away",
            )));
        }
        self.sent = true;
        let n = self.prefix.len().min(buf.remaining());
        buf.put_slice(&self.prefix[..n]);
        Poll::Ready(Ok(()))
    }
}
