use tracing::debug;

use super::{RemoteEntry, RemoteResult, RemoteStorage, LIST_PAGE_LIMIT};

/// Creates `path`, treating an existing folder as success. When a parent is
/// missing, ancestors are created top-down and each level is retried once.
/// A non-folder object at any level is an error.
pub async fn ensure_folder(storage: &dyn RemoteStorage, path: &str) -> RemoteResult<()> {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return Ok(());
    }
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        match create_if_absent(storage, current).await {
            Ok(()) => break,
            Err(err) if err.is_not_found() => match parent_folder(current) {
                Some(parent) => {
                    debug!(folder = current, parent, "parent folder missing");
                    missing.push(current);
                    current = parent;
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        }
    }
    for folder in missing.into_iter().rev() {
        create_if_absent(storage, folder).await?;
    }
    Ok(())
}

async fn create_if_absent(storage: &dyn RemoteStorage, path: &str) -> RemoteResult<()> {
    match storage.create_folder(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_folder_conflict() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Parent of a slash-separated remote path; `None` for top-level entries.
pub fn parent_folder(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

/// Immediate children of `path`, following continuation pages.
pub async fn list_all_entries(
    storage: &dyn RemoteStorage,
    path: &str,
) -> RemoteResult<Vec<RemoteEntry>> {
    let mut page = storage.list_folder(path, false, LIST_PAGE_LIMIT).await?;
    let mut entries = std::mem::take(&mut page.entries);
    while page.has_more {
        page = storage.list_folder_continue(&page.cursor).await?;
        entries.append(&mut page.entries);
    }
    Ok(entries)
}
