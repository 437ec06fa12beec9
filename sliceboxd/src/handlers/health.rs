use std::collections::BTreeMap;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use slicebox_core::DIAGNOSTIC_ENV_KEYS;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct DiagResponse {
    pub ok: bool,
    /// Whether each credential variable is set to a non-empty value. Values
    /// are never echoed.
    pub env_present: BTreeMap<&'static str, bool>,
}

/// GET /diag
pub async fn diag() -> Json<DiagResponse> {
    let env_present = DIAGNOSTIC_ENV_KEYS
        .iter()
        .map(|key| {
            let present = std::env::var(key).is_ok_and(|value| !value.is_empty());
            (*key, present)
        })
        .collect();
    Json(DiagResponse {
        ok: true,
        env_present,
    })
}
