use serde::{Deserialize, Serialize};

use crate::config::SliceDefaults;

/// One split-and-upload job. Exactly one of `url` or `path` is used; `url`
/// wins when both are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub url: Option<String>,
    pub path: Option<String>,
    pub segment_time: i64,
    pub overlap_seconds: i64,
    pub format: String,
    pub dest_root: String,
    pub group_prefix: String,
    pub max_dirs: i64,
    pub max_files_per_dir: i64,
}

impl SliceRequest {
    pub fn from_defaults(defaults: &SliceDefaults) -> Self {
        Self {
            url: None,
            path: None,
            segment_time: defaults.segment_time,
            overlap_seconds: defaults.overlap_seconds,
            format: defaults.format.clone(),
            dest_root: defaults.dest_root.clone(),
            group_prefix: defaults.group_prefix.clone(),
            max_dirs: defaults.max_dirs,
            max_files_per_dir: defaults.max_files_per_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(String),
    RemotePath(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceReport {
    pub uploaded: Vec<String>,
    pub count: usize,
}

impl SliceReport {
    pub fn new(uploaded: Vec<String>) -> Self {
        let count = uploaded.len();
        Self { uploaded, count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    Uploaded(SliceReport),
    Skipped { reason: &'static str },
}

pub const GROUP_EXISTS: &str = "group_exists";
