use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use slicebox_core::changes::{self, ChangesPage, ChangesQuery};
use slicebox_core::remote::LIST_PAGE_LIMIT;

use super::common::parse_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListChangesBody {
    pub path: String,
    pub recursive: bool,
    pub cursor: Option<String>,
    pub limit: u32,
}

impl Default for ListChangesBody {
    fn default() -> Self {
        Self {
            path: String::new(),
            recursive: true,
            cursor: None,
            limit: LIST_PAGE_LIMIT,
        }
    }
}

/// POST /list-changes
pub async fn list_changes(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ChangesPage>> {
    let body: ListChangesBody = parse_body(&body)?;
    let query = ChangesQuery {
        path: &body.path,
        recursive: body.recursive,
        cursor: body.cursor.as_deref(),
        limit: body.limit,
    };
    changes::list_changes(
        state.storage.as_ref(),
        &query,
        state.config.dropbox.app_folder_name.as_deref(),
    )
    .await
    .map(Json)
    .map_err(|err| ApiError::upstream("list_changes_failed", err))
}
