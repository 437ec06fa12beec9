use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;
use crate::links::ResolveError;
use crate::remote::RemoteError;
use crate::shards::AllocationError;
use crate::splitter::SplitError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing 'url' or 'path'")]
    MissingSource,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("cannot resolve a download link: {0}")]
    Resolve(#[from] ResolveError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("split failed: {0}")]
    Split(#[from] SplitError),
    #[error("shard allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("upload of {local} to {remote} failed: {source}")]
    Upload {
        local: PathBuf,
        remote: String,
        #[source]
        source: RemoteError,
    },
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A failed run together with the remote paths it had already uploaded.
#[derive(Debug, Error)]
#[error("{error} ({} piece(s) uploaded before failing)", uploaded.len())]
pub struct SliceFailure {
    #[source]
    pub error: PipelineError,
    pub uploaded: Vec<String>,
}

impl From<PipelineError> for SliceFailure {
    fn from(error: PipelineError) -> Self {
        Self {
            error,
            uploaded: Vec::new(),
        }
    }
}
