//! Route configuration.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/diag", get(handlers::diag))
        .route("/list-changes", post(handlers::list_changes))
        .route("/shared-link", post(handlers::shared_link))
        .route("/cursor/get", post(handlers::get_cursor))
        .route("/cursor/set", post(handlers::set_cursor))
        .route("/split-audio-upload", post(handlers::split_audio_upload))
        .route("/ensure-slices", post(handlers::ensure_slices))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
