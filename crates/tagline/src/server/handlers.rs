//! Request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::Json;
use tagline_core::TagReport;

use super::error::ApiError;
use super::AppState;

pub const HELLO_WORLD: &str = "Hello World - This is the captioning service";

pub const METHOD_NOT_ACCEPTED: &str = "This endpoint only accepts GET and POST requests";

/// `GET|POST /`: tag the base64 image in the JSON body.
///
/// The body is read raw so malformed JSON is reported as a plain-text 400
/// rather than through the JSON extractor's rejection.
pub async fn tag_image(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<TagReport>, ApiError> {
    if method != Method::GET && method != Method::POST {
        return Err(ApiError::BadRequest(METHOD_NOT_ACCEPTED.to_string()));
    }

    let report = state.pipeline.handle_json(&body).await?;
    tracing::info!(
        "Tagged image: {} tags from {} captions",
        report.tags.len(),
        report.english_cap.len()
    );
    Ok(Json(report))
}

/// `GET|POST /hello-world`: liveness check.
pub async fn hello_world() -> &'static str {
    HELLO_WORLD
}
