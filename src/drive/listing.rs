//! Metadata, listing and read operations

use std::io::SeekFrom;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::AsyncSeekExt;
use tracing::{debug, trace};

use super::item::{normalize, ChildrenPage, DriveItem};
use super::path::{canonical, split};
use super::Drive;
use crate::error::{AdapterError, Result};
use crate::filesystem::Metadata;
use crate::graph::GraphRequest;

impl Drive {
    /// Fetch the metadata of one item.
    ///
    /// A missing item is `AdapterError::NotFound`; the facade collapses it
    /// together with every other failure.
    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        debug!("stat: {:?}", path);

        let response = self
            .client
            .execute(GraphRequest::get(self.paths.endpoint(path)))
            .await?;
        let item: DriveItem = response.json()?;

        let (parent, _) = split(path);
        Ok(normalize(&self.paths, &item, &self.paths.endpoint(parent)))
    }

    /// Check if a path exists
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(AdapterError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List a directory. With `recursive`, each folder's entries follow the
    /// folder itself (depth-first).
    pub async fn list(&self, dir: &str, recursive: bool) -> Result<Vec<Metadata>> {
        debug!("list: {:?} recursive={}", dir, recursive);

        let mut entries = Vec::new();
        self.list_into(canonical(dir).to_string(), recursive, &mut entries)
            .await?;
        Ok(entries)
    }

    fn list_into<'a>(
        &'a self,
        dir: String,
        recursive: bool,
        out: &'a mut Vec<Metadata>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let context = self.paths.endpoint(&dir);

            for item in self.children(&dir).await? {
                // Entry paths are valid inputs in both addressing modes
                let entry = normalize(&self.paths, &item, &context);
                let child = entry.path.clone();
                out.push(entry);

                if recursive && item.is_folder() && !child.is_empty() {
                    self.list_into(child, true, out).await?;
                }
            }

            Ok(())
        })
    }

    /// Raw children of a directory.
    ///
    /// Only the first page is read unless next-link following is enabled.
    pub async fn children(&self, dir: &str) -> Result<Vec<DriveItem>> {
        let mut request = GraphRequest::get(self.paths.children(dir));
        let mut items = Vec::new();

        loop {
            let page: ChildrenPage = self.client.execute(request).await?.json()?;
            trace!("children of {:?}: {} item(s)", dir, page.value.len());
            items.extend(page.value);

            match page.next_link {
                Some(next) if self.follow_next_link => request = GraphRequest::get(next),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Read a whole file into memory
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        debug!("read: {:?}", path);

        let response = self
            .client
            .execute(GraphRequest::get(self.paths.item_action(path, "content")))
            .await?;
        Ok(response.body)
    }

    /// Download a file into an unlinked temporary file and return it rewound.
    ///
    /// The temporary file has no directory entry, so it disappears when the
    /// handle is dropped, including when the download fails.
    pub async fn read_stream(&self, path: &str) -> Result<tokio::fs::File> {
        debug!("read_stream: {:?}", path);

        let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
        let written = self
            .client
            .download(GraphRequest::get(self.paths.item_action(path, "content")), &mut file)
            .await?;
        trace!("read_stream: {:?} buffered {} bytes", path, written);

        file.seek(SeekFrom::Start(0)).await?;
        Ok(file)
    }
}
