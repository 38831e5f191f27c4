//! Render endpoints

use super::{download_url, ApiError, AppState};
use crate::error::Error;
use crate::pipeline::{normalize_text, render_animation, render_image, word_prefixes, Style};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Query parameters shared by both render endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateQuery {
    /// Sentence to render; a missing value is treated as empty
    pub text: Option<String>,
    /// Background color override
    pub background: Option<String>,
    /// Text color override
    pub color: Option<String>,
}

impl GenerateQuery {
    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    fn style(&self) -> Style {
        Style::new(self.background.clone(), self.color.clone())
    }
}

/// `GET /api/brat`
#[instrument(skip_all)]
pub async fn brat_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GenerateQuery>,
) -> Response {
    // Reject blank input before a browser is launched
    if let Err(err) = normalize_text(query.text()) {
        return ApiError::bad_request(err.to_string()).into_response();
    }

    let started = Instant::now();
    let result = render_image(
        state.launcher.as_ref(),
        &state.store,
        query.text(),
        &query.style(),
        state.config.site.image_settle(),
    )
    .await;

    match result {
        Ok(artifact) => {
            state.metrics.record_image(started.elapsed());
            let url = download_url(&headers, &state.config, &artifact.file_name);
            info!("Image ready at {}", url);
            Json(json!({ "status": "success", "image_url": url })).into_response()
        }
        Err(err) => {
            state.metrics.record_error();
            error!("Image render failed: {}", err);
            image_error(err).into_response()
        }
    }
}

/// `GET /api/bratvid`
#[instrument(skip_all)]
pub async fn brat_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GenerateQuery>,
) -> Response {
    let text = match normalize_text(query.text()) {
        Ok(text) => text,
        Err(err) => return ApiError::bad_request(err.to_string()).into_response(),
    };
    if word_prefixes(text).is_empty() {
        return ApiError::bad_request("Text must contain at least one word.").into_response();
    }

    let started = Instant::now();
    let result = render_animation(
        state.launcher.as_ref(),
        state.encoder.as_ref(),
        &state.store,
        &state.config.tmp_dir,
        text,
        &query.style(),
        state.config.site.frame_settle(),
    )
    .await;

    match result {
        Ok(output) => {
            state
                .metrics
                .record_video(output.frames, started.elapsed());
            let url = download_url(&headers, &state.config, &output.artifact.file_name);
            info!("Video ready at {} ({} frames)", url, output.frames);
            Json(json!({ "status": "success", "video_url": url })).into_response()
        }
        Err(err) => {
            state.metrics.record_error();
            error!("Video render failed: {}", err);
            video_error(err).into_response()
        }
    }
}

fn image_error(err: Error) -> ApiError {
    if err.is_client_error() {
        ApiError::bad_request(err.to_string())
    } else if err.is_capture_target_error() {
        ApiError::internal(err.to_string())
    } else {
        ApiError::internal(format!("Failed to create image: {err}"))
    }
}

fn video_error(err: Error) -> ApiError {
    if err.is_client_error() {
        ApiError::bad_request(err.to_string())
    } else {
        ApiError::internal(err.to_string())
    }
}
