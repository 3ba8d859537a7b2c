//! OneDrive backend for the [`Filesystem`] contract
//!
//! Every call delegates to [`Drive`]. Errors are logged and collapsed into
//! the contract's sentinels; use [`OneDriveAdapter::drive`] for typed errors.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::auth::provider_from_config;
use crate::config::Config;
use crate::drive::Drive;
use crate::error::{AdapterError, Result};
use crate::filesystem::{ByteReader, FileContents, FileStream, Filesystem, Metadata};
use crate::graph::HttpGraphClient;

/// [`Filesystem`] over one OneDrive root
pub struct OneDriveAdapter {
    drive: Drive,
}

impl OneDriveAdapter {
    pub fn new(drive: Drive) -> Self {
        Self { drive }
    }

    /// Build the adapter with the HTTP executor and configured token source
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let tokens = provider_from_config(&config.auth);
        let client = HttpGraphClient::from_config(&config.drive, tokens)?;
        Ok(Self::new(Drive::from_config(config, Arc::new(client))))
    }

    /// Typed API underneath the facade
    pub fn drive(&self) -> &Drive {
        &self.drive
    }
}

/// Log a failed operation and turn it into `None`
fn sentinel<T>(op: &str, path: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} {:?} failed: {}", op, path, e);
            None
        }
    }
}

#[async_trait]
impl Filesystem for OneDriveAdapter {
    async fn write(&self, path: &str, contents: Bytes) -> Option<Metadata> {
        sentinel("write", path, self.drive.upload_bytes(path, contents).await)
    }

    async fn write_stream(&self, path: &str, reader: ByteReader) -> Option<Metadata> {
        sentinel("write_stream", path, self.drive.upload_stream(path, reader).await)
    }

    async fn rename(&self, path: &str, new_path: &str) -> bool {
        sentinel("rename", path, self.drive.rename(path, new_path).await).is_some()
    }

    async fn copy(&self, path: &str, new_path: &str) -> bool {
        sentinel("copy", path, self.drive.copy(path, new_path).await).is_some()
    }

    async fn delete(&self, path: &str) -> bool {
        sentinel("delete", path, self.drive.delete(path).await).is_some()
    }

    async fn create_dir(&self, path: &str) -> Option<Metadata> {
        sentinel("create_dir", path, self.drive.create_dir(path).await)
    }

    async fn read(&self, path: &str) -> Option<FileContents> {
        let contents = sentinel("read", path, self.drive.read(path).await)?;
        Some(FileContents {
            path: path.to_string(),
            contents,
        })
    }

    async fn read_stream(&self, path: &str) -> Option<FileStream> {
        let stream = sentinel("read_stream", path, self.drive.read_stream(path).await)?;
        Some(FileStream {
            path: path.to_string(),
            stream,
        })
    }

    async fn list_contents(&self, directory: &str, recursive: bool) -> Option<Vec<Metadata>> {
        sentinel(
            "list_contents",
            directory,
            self.drive.list(directory, recursive).await,
        )
    }

    async fn get_metadata(&self, path: &str) -> Option<Metadata> {
        sentinel("get_metadata", path, self.drive.stat(path).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_passes_values_through() {
        assert_eq!(sentinel("stat", "a", Ok(3)), Some(3));
        let failed: Result<u8> = Err(AdapterError::NotFound("a".to_string()));
        assert_eq!(sentinel("stat", "a", failed), None);
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = Config::from_str("auth:\n  type: static\n  token: t\n").unwrap();
        config.upload.chunk_size = 1000;
        assert!(matches!(
            OneDriveAdapter::from_config(&config),
            Err(AdapterError::Config(_))
        ));
    }
}
