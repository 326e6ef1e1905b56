//! HTTP error mapping.
//!
//! Client faults become 400 with the error text; everything else becomes a
//! 500 and is logged. Both are plain text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tagline_core::PipelineError;

/// Errors returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed (400)
    BadRequest(String),

    /// A model capability or the runtime failed (500)
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_fault() {
            tracing::debug!("Rejected request: {err}");
            Self::BadRequest(err.to_string())
        } else {
            tracing::error!("Request failed: {err}");
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Self::Internal(cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {cause}"),
            )
                .into_response(),
        }
    }
}
