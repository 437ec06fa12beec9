//! Split-and-upload endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use slicebox_core::config::SliceDefaults;
use slicebox_core::{SliceOutcome, SliceReport, SliceRequest};
use tracing::info;

use super::common::{lenient_int, parse_body};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body shared by both endpoints; omitted fields fall back to the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SliceBody {
    pub url: Option<String>,
    pub path: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub segment_time: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub overlap_seconds: Option<i64>,
    pub format: Option<String>,
    pub dest_root: Option<String>,
    pub group_prefix: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub max_dirs: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub max_files_per_dir: Option<i64>,
}

impl SliceBody {
    pub fn into_request(self, defaults: &SliceDefaults) -> SliceRequest {
        let base = SliceRequest::from_defaults(defaults);
        SliceRequest {
            url: self.url,
            path: self.path,
            segment_time: self.segment_time.unwrap_or(base.segment_time),
            overlap_seconds: self.overlap_seconds.unwrap_or(base.overlap_seconds),
            format: self.format.unwrap_or(base.format).to_lowercase(),
            dest_root: self.dest_root.unwrap_or(base.dest_root),
            group_prefix: self.group_prefix.unwrap_or(base.group_prefix),
            max_dirs: self.max_dirs.unwrap_or(base.max_dirs),
            max_files_per_dir: self.max_files_per_dir.unwrap_or(base.max_files_per_dir),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnsureSlicesResponse {
    Skipped { skipped: bool, reason: &'static str },
    Uploaded(SliceReport),
}

/// POST /split-audio-upload
pub async fn split_audio_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<SliceReport>> {
    let request = parse_body::<SliceBody>(&body)?.into_request(&state.config.defaults);
    let report = state
        .pipeline
        .split_and_upload(&request)
        .await
        .map_err(|failure| ApiError::slice_failure("split_audio_upload_failed", failure))?;
    info!(group = %request.group_prefix, count = report.count, "split and upload finished");
    Ok(Json(report))
}

/// POST /ensure-slices
pub async fn ensure_slices(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<EnsureSlicesResponse>> {
    let request = parse_body::<SliceBody>(&body)?.into_request(&state.config.defaults);
    let outcome = state
        .pipeline
        .ensure_slices(&request)
        .await
        .map_err(|failure| ApiError::slice_failure("ensure_slices_failed", failure))?;
    Ok(Json(match outcome {
        SliceOutcome::Skipped { reason } => EnsureSlicesResponse::Skipped {
            skipped: true,
            reason,
        },
        SliceOutcome::Uploaded(report) => {
            info!(group = %request.group_prefix, count = report.count, "ensure slices finished");
            EnsureSlicesResponse::Uploaded(report)
        }
    }))
}
