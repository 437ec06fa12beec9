//! Numbered destination subfolders (`<root>/01`, `<root>/02`, ...) with a
//! soft per-folder file cap.

mod allocator;
mod guard;

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::remote::RemoteError;

pub use allocator::pick_destination;
pub use guard::{group_already_present, scan_for_group};

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("max shard count must be at least 1, got {0}")]
    InvalidShardCount(i64),
    #[error("max files per shard must be at least 1, got {0}")]
    InvalidCapacity(i64),
    #[error("a non-folder object occupies shard path {path}")]
    Occupied { path: String },
    #[error("remote error on shard {path}: {source}")]
    Remote {
        path: String,
        #[source]
        source: RemoteError,
    },
}

pub type AllocationResult<T> = Result<T, AllocationError>;

/// Root folder plus shard bounds, validated once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    root: String,
    max_shards: u32,
    capacity: u32,
}

impl ShardLayout {
    pub fn new(root: &str, max_shards: i64, capacity: i64) -> AllocationResult<Self> {
        let max_shards = u32::try_from(max_shards)
            .ok()
            .filter(|count| *count >= 1)
            .ok_or(AllocationError::InvalidShardCount(max_shards))?;
        let capacity = u32::try_from(capacity)
            .ok()
            .filter(|cap| *cap >= 1)
            .ok_or(AllocationError::InvalidCapacity(capacity))?;
        Ok(Self {
            root: root.trim_end_matches('/').to_string(),
            max_shards,
            capacity,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn max_shards(&self) -> u32 {
        self.max_shards
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn ordinals(&self) -> RangeInclusive<u32> {
        1..=self.max_shards
    }

    pub fn shard(&self, ordinal: u32) -> ShardFolder {
        ShardFolder {
            ordinal,
            path: format!("{}/{:02}", self.root, ordinal),
        }
    }

    pub fn last_shard(&self) -> ShardFolder {
        self.shard(self.max_shards)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFolder {
    pub ordinal: u32,
    pub path: String,
}

impl ShardFolder {
    pub fn child(&self, file_name: &str) -> String {
        format!("{}/{}", self.path, file_name)
    }
}
