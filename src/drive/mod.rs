//! Typed operations against one Graph drive
//!
//! [`Drive`] is the precise API: every operation returns
//! [`Result`](crate::error::Result) with a typed [`AdapterError`]. The
//! sentinel-style [`Filesystem`](crate::filesystem::Filesystem) facade lives in
//! [`crate::adapter`] and is built on top of this type.
//!
//! The operations are split by concern:
//! - [`listing`]: stat, exists, read, listing
//! - [`upload`]: single-shot and chunked uploads
//! - [`mutate`]: rename, copy, delete, create-directory

pub mod item;
pub mod listing;
pub mod mutate;
pub mod path;
pub mod upload;

use std::sync::Arc;

use crate::config::{Config, UploadConfig};
use crate::error::AdapterError;
use crate::graph::GraphClient;

use path::{ParentEncoding, PathTranslator};

/// One drive root reached through an injected [`GraphClient`].
///
/// Holds no mutable state; endpoints are recomputed on every call, so a
/// `Drive` can be shared freely between tasks.
pub struct Drive {
    client: Arc<dyn GraphClient>,
    paths: PathTranslator,
    parent_encoding: ParentEncoding,
    upload: UploadConfig,
    follow_next_link: bool,
}

impl Drive {
    /// Create a drive with default upload and listing behaviour
    pub fn new(client: Arc<dyn GraphClient>, paths: PathTranslator) -> Self {
        Self {
            client,
            paths,
            parent_encoding: ParentEncoding::default(),
            upload: UploadConfig::default(),
            follow_next_link: false,
        }
    }

    /// Create a drive from resolved configuration
    pub fn from_config(config: &Config, client: Arc<dyn GraphClient>) -> Self {
        let paths = PathTranslator::new(
            &config.drive.base,
            &config.drive.root,
            config.drive.addressing,
        );
        Self::new(client, paths)
            .with_parent_encoding(config.drive.parent_reference)
            .with_upload_config(config.upload)
            .with_follow_next_link(config.listing.follow_next_link)
    }

    pub fn with_parent_encoding(mut self, encoding: ParentEncoding) -> Self {
        self.parent_encoding = encoding;
        self
    }

    pub fn with_upload_config(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_follow_next_link(mut self, follow: bool) -> Self {
        self.follow_next_link = follow;
        self
    }

    /// The injected remote-call executor
    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    pub fn paths(&self) -> &PathTranslator {
        &self.paths
    }

    pub fn upload_config(&self) -> UploadConfig {
        self.upload
    }
}

/// Reject paths with no leaf component
fn require_leaf<'a>(path: &'a str, op: &str) -> Result<(&'a str, &'a str), AdapterError> {
    let (parent, leaf) = path::split(path);
    if leaf.is_empty() {
        return Err(AdapterError::InvalidPath(format!(
            "{} needs a named target, got {:?}",
            op, path
        )));
    }
    Ok((parent, leaf))
}
