use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use slicebox_core::{resolve_downloadable_url, DownloadableLink};

use super::common::parse_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SharedLinkBody {
    pub path: Option<String>,
}

/// POST /shared-link
pub async fn shared_link(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<DownloadableLink>> {
    let body: SharedLinkBody = parse_body(&body)?;
    let path = body
        .path
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_path", "missing 'path'"))?;
    resolve_downloadable_url(state.storage.as_ref(), &path)
        .await
        .map(Json)
        .map_err(|err| ApiError::upstream("shared_link_failed", err))
}
