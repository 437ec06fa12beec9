use tracing::debug;

use crate::remote::{ensure_folder, list_all_entries, RemoteStorage};

use super::{AllocationError, AllocationResult, ShardFolder, ShardLayout};

/// Returns the first shard holding fewer files than the cap, creating shard
/// folders on the way. When every shard is full the last one is returned, so
/// the cap is a target rather than a limit.
///
/// Nothing is cached between calls; concurrent callers may pick the same
/// shard.
pub async fn pick_destination(
    storage: &dyn RemoteStorage,
    layout: &ShardLayout,
) -> AllocationResult<ShardFolder> {
    for ordinal in layout.ordinals() {
        let shard = layout.shard(ordinal);
        ensure_folder(storage, &shard.path).await.map_err(|source| {
            if source.is_file_conflict() {
                AllocationError::Occupied {
                    path: shard.path.clone(),
                }
            } else {
                AllocationError::Remote {
                    path: shard.path.clone(),
                    source,
                }
            }
        })?;
        let entries = list_all_entries(storage, &shard.path)
            .await
            .map_err(|source| AllocationError::Remote {
                path: shard.path.clone(),
                source,
            })?;
        let files = entries.iter().filter(|entry| entry.is_file()).count();
        if files < layout.capacity() as usize {
            debug!(shard = %shard.path, files, "selected shard");
            return Ok(shard);
        }
    }
    let last = layout.last_shard();
    debug!(shard = %last.path, "all shards at capacity, using last");
    Ok(last)
}
