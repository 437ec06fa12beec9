use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::common::{json_text, parse_body};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_KEY: &str = "default";

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CursorGetBody {
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for CursorGetBody {
    fn default() -> Self {
        Self { key: default_key() }
    }
}

#[derive(Debug, Deserialize)]
pub struct CursorSetBody {
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default)]
    pub cursor: Option<Value>,
}

impl Default for CursorSetBody {
    fn default() -> Self {
        Self {
            key: default_key(),
            cursor: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CursorResponse {
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// POST /cursor/get. A missing or unreadable body reads the default key.
pub async fn get_cursor(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<CursorResponse>> {
    let body = parse_body::<CursorGetBody>(&body).unwrap_or_else(|err| {
        debug!(error = %err, "ignoring unreadable cursor/get body");
        CursorGetBody::default()
    });
    let cursor = state.cursors.get(&body.key).await?;
    Ok(Json(CursorResponse { cursor }))
}

/// POST /cursor/set. A null or absent `cursor` removes the key; non-string
/// values are stored as their JSON text.
pub async fn set_cursor(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    let body: CursorSetBody = parse_body(&body)?;
    let cursor = body.cursor.map(json_text);
    state.cursors.set(&body.key, cursor.as_deref()).await?;
    Ok(Json(OkResponse { ok: true }))
}
