//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use slicebox_core::{CursorError, PipelineError, SliceFailure};

/// Body of every non-success response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{detail}")]
    BadRequest { code: &'static str, detail: String },

    /// The remote store or link resolution failed.
    #[error("{detail}")]
    Upstream { code: &'static str, detail: String },

    #[error("{detail}")]
    Internal {
        code: &'static str,
        detail: String,
        uploaded: Option<Vec<String>>,
    },
}

impl ApiError {
    pub fn bad_request(code: &'static str, detail: impl ToString) -> Self {
        Self::BadRequest {
            code,
            detail: detail.to_string(),
        }
    }

    pub fn upstream(code: &'static str, detail: impl ToString) -> Self {
        Self::Upstream {
            code,
            detail: detail.to_string(),
        }
    }

    /// Maps a failed split request. Input and link problems keep their own
    /// codes; everything else is reported under `code` together with the
    /// pieces uploaded before the failure.
    pub fn slice_failure(code: &'static str, failure: SliceFailure) -> Self {
        match failure.error {
            PipelineError::MissingSource => {
                Self::bad_request("missing_source", "missing 'url' or 'path'")
            }
            PipelineError::Invalid(detail) => Self::bad_request("invalid_request", detail),
            PipelineError::Resolve(err) => Self::upstream("cannot_get_temporary_link", err),
            other => Self::Internal {
                code,
                detail: other.to_string(),
                uploaded: Some(failure.uploaded),
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. }
            | Self::Upstream { code, .. }
            | Self::Internal { code, .. } => code,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CursorError> for ApiError {
    fn from(err: CursorError) -> Self {
        Self::Internal {
            code: "cursor_store_failed",
            detail: err.to_string(),
            uploaded: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let (detail, uploaded) = match self {
            Self::BadRequest { detail, .. } | Self::Upstream { detail, .. } => (detail, None),
            Self::Internal {
                detail, uploaded, ..
            } => (detail, uploaded),
        };
        let body = ErrorResponse {
            error: code,
            detail,
            count: uploaded.as_ref().map(Vec::len),
            uploaded,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
