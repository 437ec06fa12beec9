//! Remote file storage: the provider-neutral interface plus the Dropbox
//! client behind it.

mod dropbox;
mod error;
mod folders;
mod retry;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use dropbox::DropboxClient;
pub use error::{RemoteError, RemoteResult, TRANSIENT_STATUSES};
pub use folders::{ensure_folder, list_all_entries, parent_folder};
pub use retry::RetryPolicy;

/// Page size used for non-recursive folder scans.
pub const LIST_PAGE_LIMIT: u32 = 2000;

#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn create_folder(&self, path: &str) -> RemoteResult<()>;

    async fn list_folder(
        &self,
        path: &str,
        recursive: bool,
        limit: u32,
    ) -> RemoteResult<ListFolderPage>;

    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderPage>;

    /// Returns the `link` field of the response; empty when the provider
    /// omitted it.
    async fn get_temporary_link(&self, path: &str) -> RemoteResult<String>;

    async fn list_shared_links(
        &self,
        path: &str,
        direct_only: bool,
    ) -> RemoteResult<Vec<SharedLink>>;

    async fn create_shared_link(
        &self,
        path: &str,
        settings: &SharedLinkSettings,
    ) -> RemoteResult<SharedLink>;

    /// Uploads in overwrite mode.
    async fn upload(&self, local: &Path, remote_path: &str) -> RemoteResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryTag {
    File,
    Folder,
    Deleted,
    #[serde(other)]
    Other,
}

/// One listing entry. Provider fields this crate does not interpret are kept
/// in `extra` so change listings pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    #[serde(rename = ".tag")]
    pub tag: EntryTag,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, parent: &str) -> Self {
        Self::with_tag(EntryTag::File, name.into(), parent)
    }

    pub fn folder(name: impl Into<String>, parent: &str) -> Self {
        Self::with_tag(EntryTag::Folder, name.into(), parent)
    }

    fn with_tag(tag: EntryTag, name: String, parent: &str) -> Self {
        let path = format!("{}/{}", parent.trim_end_matches('/'), name);
        Self {
            tag,
            name,
            path_lower: Some(path.to_lowercase()),
            path_display: Some(path),
            extra: Map::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.tag == EntryTag::File
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.path_display
            .as_deref()
            .and_then(|path| path.rsplit_once('/'))
            .map(|(parent, _)| parent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFolderPage {
    #[serde(default)]
    pub entries: Vec<RemoteEntry>,
    #[serde(default)]
    pub cursor: String,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLink {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SharedLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedLinkSettings {
    pub audience: String,
    pub access: String,
    pub allow_download: bool,
}

impl SharedLinkSettings {
    pub fn public_download() -> Self {
        Self {
            audience: "public".into(),
            access: "viewer".into(),
            allow_download: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_unknown_fields() {
        let raw = serde_json::json!({
            ".tag": "file",
            "name": "a-001.wav",
            "path_display": "/audio/01/a-001.wav",
            "size": 42,
            "content_hash": "abc"
        });
        let entry: RemoteEntry = serde_json::from_value(raw.clone()).unwrap();
        assert!(entry.is_file());
        assert_eq!(entry.parent_path(), Some("/audio/01"));
        assert_eq!(entry.extra.get("size"), Some(&Value::from(42)));
        assert_eq!(serde_json::to_value(&entry).unwrap()["content_hash"], "abc");
    }

    #[test]
    fn unknown_tag_is_not_a_file() {
        let entry: RemoteEntry =
            serde_json::from_value(serde_json::json!({".tag": "symlink", "name": "x"})).unwrap();
        assert_eq!(entry.tag, EntryTag::Other);
        assert!(entry.parent_path().is_none());
    }
}
