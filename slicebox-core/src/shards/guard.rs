use tracing::warn;

use crate::remote::{list_all_entries, RemoteResult, RemoteStorage};

use super::ShardLayout;

/// Whether any shard already holds a file named `<group_prefix>-...`.
///
/// Fails open: a scan error is logged and reported as "not present" so the
/// caller redoes the work instead of failing the request.
pub async fn group_already_present(
    storage: &dyn RemoteStorage,
    layout: &ShardLayout,
    group_prefix: &str,
) -> bool {
    match scan_for_group(storage, layout, group_prefix).await {
        Ok(found) => found,
        Err(err) => {
            warn!(root = layout.root(), group = group_prefix, error = %err, "group scan failed, assuming absent");
            false
        }
    }
}

/// Strict form of [`group_already_present`]. Shards that do not exist yet
/// count as empty.
pub async fn scan_for_group(
    storage: &dyn RemoteStorage,
    layout: &ShardLayout,
    group_prefix: &str,
) -> RemoteResult<bool> {
    let marker = format!("{group_prefix}-");
    for ordinal in layout.ordinals() {
        let shard = layout.shard(ordinal);
        let entries = match list_all_entries(storage, &shard.path).await {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err),
        };
        if entries
            .iter()
            .any(|entry| entry.is_file() && entry.name.starts_with(&marker))
        {
            return Ok(true);
        }
    }
    Ok(false)
}
