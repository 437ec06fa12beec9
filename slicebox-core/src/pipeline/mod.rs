//! Download, split and distribute one recording.

mod error;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::fs;
use tracing::{info, warn};

use crate::download::Downloader;
use crate::links::resolve_downloadable_url;
use crate::remote::{ensure_folder, RemoteStorage};
use crate::shards::{group_already_present, pick_destination, AllocationError, ShardLayout};
use crate::splitter::Splitter;

pub use error::{PipelineError, PipelineResult, SliceFailure};
pub use types::{SliceOutcome, SliceReport, SliceRequest, SourceRef, GROUP_EXISTS};

const WORK_DIR_PREFIX: &str = "split_";

#[derive(Clone)]
pub struct SlicePipeline {
    storage: Arc<dyn RemoteStorage>,
    downloader: Downloader,
    splitter: Splitter,
    work_root: Option<PathBuf>,
}

/// A request after validation.
#[derive(Debug, Clone)]
struct SlicePlan {
    source: SourceRef,
    layout: ShardLayout,
    group_prefix: String,
    segment_time: i64,
    overlap_seconds: i64,
    format: String,
}

impl SlicePipeline {
    pub fn new(storage: Arc<dyn RemoteStorage>, downloader: Downloader, splitter: Splitter) -> Self {
        Self {
            storage,
            downloader,
            splitter,
            work_root: None,
        }
    }

    /// Creates per-request work directories under `root` instead of the
    /// system temp directory.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// Splits and uploads unconditionally.
    pub async fn split_and_upload(&self, request: &SliceRequest) -> Result<SliceReport, SliceFailure> {
        let plan = validate(request)?;
        self.execute(&plan).await
    }

    /// Like [`split_and_upload`](Self::split_and_upload), but skips the work
    /// when any shard already holds a piece of the group.
    pub async fn ensure_slices(&self, request: &SliceRequest) -> Result<SliceOutcome, SliceFailure> {
        let plan = validate(request)?;
        if group_already_present(self.storage.as_ref(), &plan.layout, &plan.group_prefix).await {
            info!(root = plan.layout.root(), group = %plan.group_prefix, "group already present, skipping");
            return Ok(SliceOutcome::Skipped {
                reason: GROUP_EXISTS,
            });
        }
        self.execute(&plan).await.map(SliceOutcome::Uploaded)
    }

    async fn execute(&self, plan: &SlicePlan) -> Result<SliceReport, SliceFailure> {
        let url = self.source_url(&plan.source).await?;
        let mut uploaded = Vec::new();
        match self.run(plan, &url, &mut uploaded).await {
            Ok(()) => Ok(SliceReport::new(uploaded)),
            Err(error) => {
                warn!(group = %plan.group_prefix, uploaded = uploaded.len(), error = %error, "split and upload failed");
                Err(SliceFailure { error, uploaded })
            }
        }
    }

    async fn source_url(&self, source: &SourceRef) -> PipelineResult<String> {
        match source {
            SourceRef::Url(url) => Ok(url.clone()),
            SourceRef::RemotePath(path) => {
                let link = resolve_downloadable_url(self.storage.as_ref(), path).await?;
                info!(path = %path, kind = %link.kind, "resolved source path");
                Ok(link.url)
            }
        }
    }

    async fn run(&self, plan: &SlicePlan, url: &str, uploaded: &mut Vec<String>) -> PipelineResult<()> {
        let storage = self.storage.as_ref();
        ensure_folder(storage, plan.layout.root()).await?;

        // Removed on drop, on every exit path.
        let work = self.work_dir()?;
        let source = self.downloader.fetch(url, work.path()).await?;
        let pieces = self
            .splitter
            .split(
                &source,
                &work.path().join("pieces"),
                &plan.group_prefix,
                plan.segment_time,
                plan.overlap_seconds,
                &plan.format,
            )
            .await?;

        for piece in &pieces {
            let shard = pick_destination(storage, &plan.layout).await?;
            let remote = shard.child(&piece.file_name());
            let result = storage.upload(&piece.path, &remote).await;
            discard(&piece.path).await;
            result.map_err(|source| PipelineError::Upload {
                local: piece.path.clone(),
                remote: remote.clone(),
                source,
            })?;
            info!(remote = %remote, shard = shard.ordinal, "piece uploaded");
            uploaded.push(remote);
        }

        if let Err(err) = work.close() {
            warn!(error = %err, "failed to remove work directory");
        }
        Ok(())
    }

    fn work_dir(&self) -> PipelineResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_DIR_PREFIX);
        let result = match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        result.map_err(|source| PipelineError::Io {
            path: self
                .work_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })
    }
}

async fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %err, "failed to delete piece");
    }
}

fn validate(request: &SliceRequest) -> PipelineResult<SlicePlan> {
    let source = match (non_empty(&request.url), non_empty(&request.path)) {
        (Some(url), _) => SourceRef::Url(url.to_string()),
        (None, Some(path)) => SourceRef::RemotePath(path.to_string()),
        (None, None) => return Err(PipelineError::MissingSource),
    };
    let layout = ShardLayout::new(&request.dest_root, request.max_dirs, request.max_files_per_dir)
        .map_err(|err: AllocationError| PipelineError::Invalid(err.to_string()))?;
    if request.segment_time < 1 {
        return Err(PipelineError::Invalid(format!(
            "segment_time must be at least 1, got {}",
            request.segment_time
        )));
    }
    let group_prefix = request.group_prefix.trim();
    if group_prefix.is_empty() || group_prefix.contains('/') {
        return Err(PipelineError::Invalid(format!(
            "group_prefix {:?} must be non-empty and contain no '/'",
            request.group_prefix
        )));
    }
    let format = request.format.trim().to_ascii_lowercase();
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PipelineError::Invalid(format!(
            "format {:?} must be alphanumeric",
            request.format
        )));
    }
    Ok(SlicePlan {
        source,
        layout,
        group_prefix: group_prefix.to_string(),
        segment_time: request.segment_time,
        overlap_seconds: request.overlap_seconds,
        format,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
