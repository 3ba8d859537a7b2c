//! Generic filesystem contract
//!
//! Callers program against [`Filesystem`] and never see provider requests.
//! The contract uses sentinel returns: `None` or `false` for every failure,
//! with no distinction between a missing object and a failed call. Backends
//! that need precise errors expose a typed API alongside.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncRead;

/// File type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
}

/// Attributes of a file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Root-relative path, no leading slash
    pub path: String,
    pub name: Option<String>,
    /// Last modification, seconds since the Unix epoch
    pub timestamp: Option<i64>,
    /// Size in bytes
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub mimetype: Option<String>,
    /// Browser URL of the item
    pub link: Option<String>,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryType::Dir)
    }
}

/// Result of [`Filesystem::read`]
#[derive(Debug, Clone)]
pub struct FileContents {
    pub path: String,
    pub contents: Bytes,
}

/// Result of [`Filesystem::read_stream`].
///
/// `stream` is positioned at the start of the content and backed by an
/// unlinked temporary file, so dropping it releases all local storage.
#[derive(Debug)]
pub struct FileStream {
    pub path: String,
    pub stream: tokio::fs::File,
}

/// Reader type accepted by the streaming writes
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Path-addressed object store with sentinel failure reporting.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Create or replace a file from an in-memory body
    async fn write(&self, path: &str, contents: Bytes) -> Option<Metadata>;

    /// Create or replace a file from a reader
    async fn write_stream(&self, path: &str, reader: ByteReader) -> Option<Metadata>;

    /// Replace a file; same as `write` unless a backend distinguishes them
    async fn update(&self, path: &str, contents: Bytes) -> Option<Metadata> {
        self.write(path, contents).await
    }

    /// Replace a file from a reader
    async fn update_stream(&self, path: &str, reader: ByteReader) -> Option<Metadata> {
        self.write_stream(path, reader).await
    }

    /// Move or rename an object
    async fn rename(&self, path: &str, new_path: &str) -> bool;

    /// Copy an object
    async fn copy(&self, path: &str, new_path: &str) -> bool;

    /// Delete an object
    async fn delete(&self, path: &str) -> bool;

    /// Delete a directory and its contents
    async fn delete_dir(&self, path: &str) -> bool {
        self.delete(path).await
    }

    /// Create a directory
    async fn create_dir(&self, path: &str) -> Option<Metadata>;

    /// Metadata if the object exists
    async fn has(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path).await
    }

    /// Read a whole file into memory
    async fn read(&self, path: &str) -> Option<FileContents>;

    /// Open a file for streaming reads
    async fn read_stream(&self, path: &str) -> Option<FileStream>;

    /// List a directory, optionally descending depth-first
    async fn list_contents(&self, directory: &str, recursive: bool) -> Option<Vec<Metadata>>;

    /// Metadata for an object
    async fn get_metadata(&self, path: &str) -> Option<Metadata>;

    async fn get_size(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path).await
    }

    async fn get_mimetype(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path).await
    }

    async fn get_timestamp(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serializes_type_field() {
        let meta = Metadata {
            path: "docs".to_string(),
            name: Some("docs".to_string()),
            timestamp: None,
            size: Some(0),
            kind: EntryType::Dir,
            mimetype: None,
            link: None,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["type"], "dir");
        assert!(value["timestamp"].is_null());
        assert!(meta.is_dir());
        assert!(!meta.is_file());
    }
}
