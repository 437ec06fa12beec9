mod ffmpeg;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub use ffmpeg::{FfmpegTool, MediaTool};

/// Pieces never start within this many seconds of the end.
pub const END_TOLERANCE_SECONDS: f64 = 0.1;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("segment length must be at least 1 second, got {0}")]
    InvalidSegmentLength(i64),
    #[error("invalid output format {0:?}")]
    InvalidFormat(String),
    #[error("duration probe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },
    #[error("command failed ({command}): {stderr}")]
    Transcode {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type SplitResult<T> = Result<T, SplitError>;

/// Distance between consecutive piece starts. Always at least one second, so
/// splitting terminates for any overlap.
pub fn segment_step(segment_seconds: u32, overlap_seconds: i64) -> u32 {
    let step = i64::from(segment_seconds) - overlap_seconds.max(0);
    step.max(1) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    /// 1-based.
    pub index: u32,
    pub start: f64,
    pub duration: f64,
}

/// Lays out overlapping pieces over `[0, total)`. Stops once a piece reaches
/// the end or the next start would fall inside the end tolerance.
pub fn plan_segments(total: f64, segment_seconds: u32, overlap_seconds: i64) -> Vec<SegmentSpan> {
    let mut spans = Vec::new();
    if !total.is_finite() || segment_seconds == 0 {
        return spans;
    }
    let length = f64::from(segment_seconds);
    let step = f64::from(segment_step(segment_seconds, overlap_seconds));
    let mut start = 0.0;
    let mut index = 1;
    while start < total - END_TOLERANCE_SECONDS {
        spans.push(SegmentSpan {
            index,
            start,
            duration: length.min(total - start),
        });
        if start + length >= total {
            break;
        }
        index += 1;
        start += step;
    }
    spans
}

pub fn piece_file_name(group_prefix: &str, index: u32, format: &str) -> String {
    format!("{group_prefix}-{index:03}.{format}")
}

/// A produced piece, owned by the request until uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPiece {
    pub group_prefix: String,
    pub index: u32,
    pub format: String,
    pub path: PathBuf,
    pub start: f64,
    pub duration: f64,
}

impl SegmentPiece {
    pub fn file_name(&self) -> String {
        piece_file_name(&self.group_prefix, self.index, &self.format)
    }
}

#[derive(Clone)]
pub struct Splitter {
    tool: Arc<dyn MediaTool>,
}

impl Splitter {
    pub fn new(tool: Arc<dyn MediaTool>) -> Self {
        Self { tool }
    }

    /// Cuts `input` into `<group_prefix>-NNN.<format>` pieces inside
    /// `out_dir`. Pieces written before a failure stay on disk.
    pub async fn split(
        &self,
        input: &Path,
        out_dir: &Path,
        group_prefix: &str,
        segment_seconds: i64,
        overlap_seconds: i64,
        format: &str,
    ) -> SplitResult<Vec<SegmentPiece>> {
        let segment = u32::try_from(segment_seconds)
            .ok()
            .filter(|seconds| *seconds >= 1)
            .ok_or(SplitError::InvalidSegmentLength(segment_seconds))?;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SplitError::InvalidFormat(format.to_string()));
        }
        fs::create_dir_all(out_dir)
            .await
            .map_err(|source| SplitError::Io {
                path: out_dir.to_path_buf(),
                source,
            })?;

        let total = self.tool.probe_duration(input).await?;
        if !total.is_finite() || total < 0.0 {
            return Err(SplitError::Probe {
                path: input.to_path_buf(),
                message: format!("unusable duration {total}"),
            });
        }
        let spans = plan_segments(total, segment, overlap_seconds);
        info!(
            input = %input.display(),
            duration = total,
            pieces = spans.len(),
            step = segment_step(segment, overlap_seconds),
            "splitting audio"
        );

        let mut pieces = Vec::with_capacity(spans.len());
        for span in spans {
            let path = out_dir.join(piece_file_name(group_prefix, span.index, format));
            self.tool
                .extract(input, span.start, span.duration, &path)
                .await?;
            debug!(piece = %path.display(), start = span.start, length = span.duration, "piece written");
            pieces.push(SegmentPiece {
                group_prefix: group_prefix.to_string(),
                index: span.index,
                format: format.to_string(),
                path,
                start: span.start,
                duration: span.duration,
            });
        }
        Ok(pieces)
    }
}
