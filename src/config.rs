//! Configuration parsing and structures

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::drive::path::{Addressing, ParentEncoding};
use crate::env::expand_env_vars;

/// Default Microsoft Graph endpoint
pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Bodies above this size go through an upload session
pub const DEFAULT_UPLOAD_THRESHOLD: u64 = 4_000_000;

/// 60 MiB, the largest chunk the upload session accepts
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024 * 60;

/// Upload session chunks must be a multiple of 320 KiB
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

// =============================================================================
// Raw Config (Deserialized from YAML)
// =============================================================================

/// Raw configuration as deserialized from YAML.
/// This is converted to `Config` via `resolve()`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Drive addressing
    #[serde(default)]
    pub drive: RawDriveConfig,

    /// Token source
    pub auth: AuthConfig,

    /// Upload tuning
    #[serde(default)]
    pub upload: RawUploadConfig,

    /// Listing behaviour
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Drive section; every field falls back to a default
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDriveConfig {
    /// Graph API base URL
    pub api_base: Option<String>,

    /// Drive selector, e.g. `/me/drive/` or `/drives/{id}/`
    pub base: Option<String>,

    /// Root item below the drive; logical paths are item ids in id mode
    pub root: Option<String>,

    /// Path-style or id-style addressing
    pub addressing: Option<Addressing>,

    /// Encoding of `parentReference.path` for rename
    pub parent_reference: Option<ParentEncoding>,

    /// Request timeout (e.g., "30s", "2m")
    #[serde(default)]
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Upload section
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawUploadConfig {
    /// Size above which uploads use a session
    pub threshold: Option<u64>,

    /// Bytes per session chunk
    pub chunk_size: Option<u64>,
}

/// Token provider configuration (tagged enum)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Fixed bearer token
    Static { token: String },

    /// Token fetched from an HTTP token service
    Http {
        endpoint: String,
        #[serde(default = "default_http_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// Listing configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListingConfig {
    /// Follow `@odata.nextLink` instead of stopping after the first page
    #[serde(default)]
    pub follow_next_link: bool,
}

// =============================================================================
// Resolved Config (Ready for use)
// =============================================================================

/// Top-level configuration (resolved from RawConfig)
#[derive(Debug, Clone)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Drive addressing (fully resolved)
    pub drive: DriveConfig,

    /// Token source
    pub auth: AuthConfig,

    /// Upload tuning (fully resolved)
    pub upload: UploadConfig,

    /// Listing behaviour
    pub listing: ListingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Drive configuration (resolved)
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub api_base: String,
    pub base: String,
    pub root: String,
    pub addressing: Addressing,
    pub parent_reference: ParentEncoding,
    pub timeout: Option<Duration>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        RawDriveConfig::default().resolve()
    }
}

/// Upload configuration (resolved)
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    pub threshold: u64,
    pub chunk_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_UPLOAD_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl UploadConfig {
    /// Check the threshold and the chunk size limits of upload sessions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::ValidationError(
                "upload.threshold must be greater than zero".to_string(),
            ));
        }

        if self.chunk_size == 0 || self.chunk_size % CHUNK_ALIGNMENT != 0 {
            return Err(ConfigError::ValidationError(format!(
                "upload.chunk_size must be a non-zero multiple of {} bytes, got {}",
                CHUNK_ALIGNMENT, self.chunk_size
            )));
        }

        if self.chunk_size > DEFAULT_CHUNK_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "upload.chunk_size cannot exceed {} bytes, got {}",
                DEFAULT_CHUNK_SIZE, self.chunk_size
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Resolution Logic
// =============================================================================

impl RawDriveConfig {
    fn resolve(self) -> DriveConfig {
        let addressing = self.addressing.unwrap_or_default();
        // Id mode addresses the item collection; an empty root means the drive root
        let (default_base, default_root) = match addressing {
            Addressing::Path => ("/me/drive/", "root"),
            Addressing::Id => ("/me/drive/items/", ""),
        };
        DriveConfig {
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            base: self.base.unwrap_or_else(|| default_base.to_string()),
            root: self.root.unwrap_or_else(|| default_root.to_string()),
            addressing,
            parent_reference: self.parent_reference.unwrap_or_default(),
            timeout: self.timeout,
        }
    }
}

impl RawUploadConfig {
    fn resolve(self) -> UploadConfig {
        UploadConfig {
            threshold: self.threshold.unwrap_or(DEFAULT_UPLOAD_THRESHOLD),
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        }
    }
}

impl RawConfig {
    /// Resolve raw config into final config by filling in defaults
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let RawConfig {
            logging,
            drive,
            auth,
            upload,
            listing,
        } = self;

        Ok(Config {
            logging,
            drive: drive.resolve(),
            auth,
            upload: upload.resolve(),
            listing,
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.clone(), e.to_string()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string, expanding `${VAR}` references first
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content)?;
        let raw: RawConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.resolve()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drive.api_base.is_empty() {
            return Err(ConfigError::ValidationError(
                "drive.api_base cannot be empty".to_string(),
            ));
        }

        if self.drive.addressing == Addressing::Path && self.drive.root.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "drive.root cannot be empty with path addressing".to_string(),
            ));
        }

        match &self.auth {
            AuthConfig::Static { token } if token.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "auth.token cannot be empty".to_string(),
                ));
            }
            AuthConfig::Http { endpoint, .. } if endpoint.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "auth.endpoint cannot be empty".to_string(),
                ));
            }
            _ => {}
        }

        self.upload.validate()?;

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
