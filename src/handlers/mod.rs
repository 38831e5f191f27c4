//! HTTP handlers
//!
//! - [`generate`] - `/api/brat` and `/api/bratvid`
//! - [`download`] - `/download/file/:filename`
//! - [`status`] - `/health` and `/status`

pub mod download;
pub mod generate;
pub mod status;

pub use status::ServiceMetrics;

use crate::config::AppConfig;
use crate::pipeline::{SessionLauncher, VideoEncoder};
use crate::storage::ArtifactStore;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{header, HeaderMap, StatusCode};
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<AppConfig>,
    /// Opens one browser session per render
    pub launcher: Arc<dyn SessionLauncher>,
    /// Frame sequence encoder
    pub encoder: Arc<dyn VideoEncoder>,
    /// Output directory and deletion scheduler
    pub store: ArtifactStore,
    /// Render counters
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Assemble state with fresh metrics
    pub fn new(
        config: AppConfig,
        launcher: Arc<dyn SessionLauncher>,
        encoder: Arc<dyn VideoEncoder>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
            encoder,
            store,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Error body returned as `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// Client-visible message
    pub message: String,
}

impl ApiError {
    /// 400 with `message`
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 404 with `message`
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// 500 with `message`
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Scheme and authority download links are built on, without a trailing
/// slash.
///
/// A configured public URL wins; otherwise the request's `Host` header is
/// used with the scheme from `x-forwarded-proto` (default `http`).
pub fn base_url(headers: &HeaderMap, config: &AppConfig) -> String {
    if let Some(public) = &config.public_base_url {
        return public.trim_end_matches('/').to_string();
    }

    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

/// Absolute download URL of an artifact
pub fn download_url(headers: &HeaderMap, config: &AppConfig, file_name: &str) -> String {
    format!("{}/download/file/{}", base_url(headers, config), file_name)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
