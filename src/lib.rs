//! onedrive-adapter: OneDrive as a generic filesystem backend
//!
//! This library maps the Microsoft Graph drive API onto the path-addressed
//! [`Filesystem`] contract: read, write, list, rename, copy, delete and
//! create-directory.
//!
//! # Architecture
//!
//! - **Graph client**: Executes requests. Injected as `Arc<dyn GraphClient>`;
//!   [`graph::HttpGraphClient`] is the `reqwest` implementation.
//! - **Drive**: Typed operations returning [`AdapterError`], including the
//!   chunked upload engine for large files.
//! - **Adapter**: The [`Filesystem`] facade, which reports failures as
//!   `None`/`false`.
//! - **Auth**: Bearer token sources consulted by the HTTP client.
//!
//! # Example
//!
//! ```no_run
//! use onedrive_adapter::config::Config;
//! use onedrive_adapter::{Filesystem, OneDriveAdapter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file(&"config.yaml".into())?;
//! let adapter = OneDriveAdapter::from_config(&config)?;
//!
//! if let Some(entries) = adapter.list_contents("docs", false).await {
//!     for entry in entries {
//!         println!("{}", entry.path);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod auth;
pub mod config;
pub mod drive;
pub mod env;
pub mod error;
pub mod filesystem;
pub mod graph;

pub use adapter::OneDriveAdapter;
pub use error::{AdapterError, Result};
pub use filesystem::{EntryType, Filesystem, Metadata};
