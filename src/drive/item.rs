//! Graph drive item wire types and normalization into [`Metadata`]

use chrono::DateTime;
use serde::Deserialize;

use super::path::{canonical, join, Addressing, PathTranslator};
use crate::filesystem::{EntryType, Metadata};

/// Drive item as returned by the Graph API. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub size: Option<u64>,
    pub file: Option<FileFacet>,
    pub folder: Option<serde_json::Value>,
    pub web_url: Option<String>,
}

impl DriveItem {
    /// Items with a `folder` facet have children that can be listed
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    pub mime_type: Option<String>,
}

/// One page of a children listing
#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Convert a drive item into the generic attribute record.
///
/// `context` is the endpoint (or logical path) of the directory holding the
/// item. Its prefix and action suffixes are stripped before joining with the
/// item name, so root-level items get `path == name`.
///
/// With id addressing the path is the item id, which is what every other
/// operation accepts; the joined form is used only when the id is missing.
pub fn normalize(paths: &PathTranslator, item: &DriveItem, context: &str) -> Metadata {
    let joined = || {
        let dir = paths.logical_path(context);
        join(&dir, item.name.as_deref().unwrap_or_default())
    };
    let path = match (paths.addressing(), &item.id) {
        (Addressing::Id, Some(id)) => id.clone(),
        _ => joined(),
    };

    let (kind, mimetype) = match &item.file {
        Some(file) => (EntryType::File, file.mime_type.clone()),
        None => (EntryType::Dir, None),
    };

    Metadata {
        path: canonical(&path).to_string(),
        name: item.name.clone(),
        timestamp: item
            .last_modified_date_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp()),
        size: item.size,
        kind,
        mimetype,
        link: item.web_url.clone(),
    }
}
