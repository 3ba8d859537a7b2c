//! Logical path to Graph endpoint translation
//!
//! Path-style endpoints look like `/me/drive/root:/docs/a.txt`, and actions on
//! them need a closing colon: `/me/drive/root:/docs/a.txt:/content`. The root
//! item itself has no colon form (`/me/drive/root/children`). Id-style
//! endpoints address items directly: `/me/drive/items/{id}/content`.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

/// Id accepted by the drive API as an alias for its root folder
const DRIVE_ROOT_ID: &str = "root";

/// How items are referenced in endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// Hierarchical paths below the root item
    #[default]
    Path,
    /// Logical paths are item ids
    Id,
}

/// Encoding of `parentReference.path` in rename requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentEncoding {
    /// Try `Prefixed`, then `DriveRelative` if the first attempt fails
    #[default]
    Auto,
    /// The full endpoint prefix, e.g. `/me/drive/root:/docs/`
    Prefixed,
    /// The prefix without the account segment, e.g. `/drive/root:/docs/`
    DriveRelative,
}

/// Strip surrounding slashes
pub fn canonical(path: &str) -> &str {
    path.trim_matches('/')
}

/// Split a logical path into parent directory and leaf name
pub fn split(path: &str) -> (&str, &str) {
    match canonical(path).rsplit_once('/') {
        Some((parent, leaf)) => (parent, leaf),
        None => ("", canonical(path)),
    }
}

/// Join a directory and a child name into a logical path
pub fn join(dir: &str, name: &str) -> String {
    let dir = canonical(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Maps logical paths to endpoints for one configured drive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    prefix: String,
    root_item: String,
    root_id: String,
    addressing: Addressing,
}

impl PathTranslator {
    /// `base` selects the drive (`/me/drive/`), `root` the item below it.
    ///
    /// With id addressing `base` is the item collection (`/me/drive/items/`)
    /// and `root` the id of the logical root; empty means the drive root.
    pub fn new(base: &str, root: &str, addressing: Addressing) -> Self {
        match addressing {
            Addressing::Path => {
                let joined = format!("{}/{}", base.trim_end_matches('/'), canonical(root));
                let root_item = format!("/{}", canonical(&joined));
                Self {
                    prefix: format!("{}:", root_item),
                    root_item,
                    root_id: String::new(),
                    addressing,
                }
            }
            Addressing::Id => {
                let prefix = format!("/{}", canonical(base));
                let root_id = match canonical(root) {
                    "" => DRIVE_ROOT_ID.to_string(),
                    id => id.to_string(),
                };
                Self {
                    root_item: format!("{}/{}", prefix, root_id),
                    prefix,
                    root_id,
                    addressing,
                }
            }
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Endpoint of the configured root item
    pub fn root_item(&self) -> &str {
        &self.root_item
    }

    /// Endpoint for the item at `path`.
    ///
    /// Path segments are percent-encoded. With id addressing the first
    /// segment is an item id and any further segments name a descendant of
    /// it, giving `/items/{id}:/{name}`.
    pub fn endpoint(&self, path: &str) -> String {
        let path = canonical(path);
        let endpoint = match self.addressing {
            _ if path.is_empty() => self.root_item.clone(),
            Addressing::Path => format!("{}/{}", self.prefix, encode_path(path)),
            Addressing::Id => match path.split_once('/') {
                Some((id, below)) => format!(
                    "{}/{}:/{}",
                    self.prefix,
                    urlencoding::encode(id),
                    encode_path(below)
                ),
                None => format!("{}/{}", self.prefix, urlencoding::encode(path)),
            },
        };
        trace!("endpoint: {:?} -> {}", path, endpoint);
        endpoint
    }

    /// Endpoint for `action` (`content`, `copy`, ...) on the item at `path`
    pub fn item_action(&self, path: &str, action: &str) -> String {
        let path = canonical(path);
        let colon_form = match self.addressing {
            Addressing::Path => !path.is_empty(),
            Addressing::Id => path.contains('/'),
        };
        if colon_form {
            format!("{}:/{}", self.endpoint(path), action)
        } else {
            format!("{}/{}", self.endpoint(path), action)
        }
    }

    /// Endpoint listing the children of `dir`
    pub fn children(&self, dir: &str) -> String {
        self.item_action(dir, "children")
    }

    /// Value of `parentReference` for an item moved or copied into `dir`.
    ///
    /// `Auto` renders as `Prefixed`; callers handle the fallback.
    pub fn parent_reference(&self, dir: &str, encoding: ParentEncoding) -> Value {
        let dir = canonical(dir);
        match self.addressing {
            Addressing::Id if dir.is_empty() && self.root_id == DRIVE_ROOT_ID => {
                json!({ "path": "/drive/root:" })
            }
            Addressing::Id if dir.is_empty() => json!({ "id": self.root_id }),
            Addressing::Id => json!({ "id": dir }),
            Addressing::Path => {
                let prefixed = if dir.is_empty() {
                    format!("{}/", self.prefix)
                } else {
                    format!("{}/{}/", self.prefix, dir)
                };
                let path = match encoding {
                    ParentEncoding::Auto | ParentEncoding::Prefixed => prefixed,
                    ParentEncoding::DriveRelative => drive_relative(&prefixed).to_string(),
                };
                json!({ "path": path })
            }
        }
    }

    /// Recover the logical path from an endpoint built by this translator.
    ///
    /// Action suffixes (`:/children`, `/children`) are dropped and segments
    /// are decoded. Strings that do not start with the prefix are treated as
    /// logical paths already.
    pub fn logical_path(&self, endpoint: &str) -> String {
        if let Some(rest) = endpoint.strip_prefix(self.prefix.as_str()) {
            let logical = match self.addressing {
                // Item names cannot contain ':', so the first one starts the action
                Addressing::Path => {
                    decode_path(canonical(rest.split(':').next().unwrap_or_default()))
                }
                Addressing::Id => {
                    let rest = rest.strip_suffix("/children").unwrap_or(rest);
                    let mut parts = rest.splitn(3, ':');
                    let id = decode_path(canonical(parts.next().unwrap_or_default()));
                    match parts.next().map(canonical) {
                        Some(below) if !below.is_empty() => join(&id, &decode_path(below)),
                        _ => id,
                    }
                }
            };
            if self.addressing == Addressing::Id && logical == self.root_id {
                return String::new();
            }
            return logical;
        }

        if let Some(rest) = endpoint.strip_prefix(self.root_item()) {
            if rest.is_empty() || rest.starts_with('/') {
                // Root item, possibly with an action such as `/children`
                return String::new();
            }
        }

        canonical(endpoint).to_string()
    }
}

/// Percent-encode each segment, keeping the `/` separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Drop everything before the `/drive` segment
fn drive_relative(path: &str) -> &str {
    match path.find("/drive") {
        Some(index) => &path[index..],
        None => path,
    }
}
