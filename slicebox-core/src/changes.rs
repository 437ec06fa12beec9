//! Folder change listing with cursor continuation.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::remote::{ListFolderPage, RemoteResult, RemoteStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Resumed from a caller-supplied cursor.
    Continue,
    /// Path listed as given.
    AppFolder,
    /// Path rewritten under `/Apps/<app folder>`.
    FullDropbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesPage {
    #[serde(flatten)]
    pub page: ListFolderPage,
    pub normalized_path: Option<String>,
    pub mode: ListingMode,
}

#[derive(Debug, Clone)]
pub struct ChangesQuery<'a> {
    pub path: &'a str,
    pub recursive: bool,
    pub cursor: Option<&'a str>,
    pub limit: u32,
}

/// Lists changes under `query.path`, or continues from `query.cursor`.
///
/// Credentials scoped to an app folder see it as the root, while
/// full-access credentials need the `/Apps/<name>` prefix. A not-found on
/// the plain path is retried with that prefix when `app_folder_name` is set.
pub async fn list_changes(
    storage: &dyn RemoteStorage,
    query: &ChangesQuery<'_>,
    app_folder_name: Option<&str>,
) -> RemoteResult<ChangesPage> {
    if let Some(cursor) = query.cursor.filter(|cursor| !cursor.is_empty()) {
        let page = storage.list_folder_continue(cursor).await?;
        return Ok(ChangesPage {
            page,
            normalized_path: None,
            mode: ListingMode::Continue,
        });
    }
    match storage
        .list_folder(query.path, query.recursive, query.limit)
        .await
    {
        Ok(page) => Ok(ChangesPage {
            page,
            normalized_path: Some(query.path.to_string()),
            mode: ListingMode::AppFolder,
        }),
        Err(err) if err.is_not_found() => {
            let Some(app_name) = app_folder_name.filter(|name| !name.trim().is_empty()) else {
                return Err(err);
            };
            let alternate = full_dropbox_path(query.path, app_name.trim());
            info!(path = query.path, alternate = %alternate, "path not found, retrying under app folder");
            let page = storage
                .list_folder(&alternate, query.recursive, query.limit)
                .await?;
            Ok(ChangesPage {
                page,
                normalized_path: Some(alternate),
                mode: ListingMode::FullDropbox,
            })
        }
        Err(err) => Err(err),
    }
}

pub fn full_dropbox_path(path: &str, app_name: &str) -> String {
    if path.starts_with("/Apps/") {
        return path.to_string();
    }
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        format!("/Apps/{app_name}")
    } else {
        format!("/Apps/{app_name}/{relative}")
    }
}
