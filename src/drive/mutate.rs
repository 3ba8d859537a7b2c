//! Rename, copy, delete and create-directory

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::item::{normalize, DriveItem};
use super::path::ParentEncoding;
use super::{require_leaf, Drive};
use crate::error::Result;
use crate::filesystem::Metadata;
use crate::graph::GraphRequest;

impl Drive {
    /// Move or rename an item.
    ///
    /// With [`ParentEncoding::Auto`] a rejected request is retried once with
    /// the drive-relative parent path, unless both encodings are the same.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        debug!("rename: {:?} -> {:?}", from, to);
        let (parent, leaf) = require_leaf(to, "rename")?;

        let encoding = match self.parent_encoding {
            ParentEncoding::Auto => ParentEncoding::Prefixed,
            other => other,
        };
        let first = self.move_body(parent, leaf, encoding);

        match self.patch(from, first.clone()).await {
            Ok(()) => Ok(()),
            Err(e) if self.parent_encoding == ParentEncoding::Auto => {
                let second = self.move_body(parent, leaf, ParentEncoding::DriveRelative);
                if second == first {
                    return Err(e);
                }
                warn!(
                    "rename {:?} rejected ({}), retrying with drive-relative parent",
                    from, e
                );
                self.patch(from, second).await
            }
            Err(e) => Err(e),
        }
    }

    /// Copy an item. Completes once the remote accepts the request; the copy
    /// itself runs asynchronously on the remote side.
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        debug!("copy: {:?} -> {:?}", from, to);
        let (parent, leaf) = require_leaf(to, "copy")?;

        let request = GraphRequest::new(Method::POST, self.paths.item_action(from, "copy"))
            .json(self.move_body(parent, leaf, ParentEncoding::Prefixed));
        self.client.execute(request).await?;
        Ok(())
    }

    /// Delete an item; directories go with their contents
    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!("delete: {:?}", path);
        require_leaf(path, "delete")?;

        let request = GraphRequest::new(Method::DELETE, self.paths.endpoint(path));
        self.client.execute(request).await?;
        Ok(())
    }

    /// Create a directory and return its metadata
    pub async fn create_dir(&self, path: &str) -> Result<Metadata> {
        debug!("create_dir: {:?}", path);
        let (parent, leaf) = require_leaf(path, "create_dir")?;

        let request = GraphRequest::new(Method::POST, self.paths.children(parent))
            .json(json!({ "name": leaf, "folder": {} }));
        let item: DriveItem = self.client.execute(request).await?.json()?;

        Ok(normalize(&self.paths, &item, &self.paths.endpoint(parent)))
    }

    fn move_body(&self, parent: &str, leaf: &str, encoding: ParentEncoding) -> Value {
        json!({
            "name": leaf,
            "parentReference": self.paths.parent_reference(parent, encoding),
        })
    }

    async fn patch(&self, path: &str, body: Value) -> Result<()> {
        let request = GraphRequest::new(Method::PATCH, self.paths.endpoint(path)).json(body);
        self.client.execute(request).await?;
        Ok(())
    }
}
