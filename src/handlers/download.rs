//! Artifact download endpoint

use super::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, instrument};

/// `GET /download/file/:filename`
///
/// Streams the raw bytes of a generated artifact as
/// `application/octet-stream`; anything else is a 404.
#[instrument(skip(state))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match state.store.read(&filename).await {
        Ok(Some(bytes)) => {
            debug!("Serving {} ({} bytes)", filename, bytes.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                bytes,
            )
                .into_response()
        }
        Ok(None) => ApiError::not_found("File not found").into_response(),
        Err(err) => {
            error!("Failed to read {}: {}", filename, err);
            ApiError::not_found("File not found").into_response()
        }
    }
}
