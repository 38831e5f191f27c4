//! Status and health check handlers.
//!
//! This module provides HTTP endpoints for monitoring the render service:
//! - `/status` - Render counters, pending deletions and latency percentiles
//! - `/health` - Simple health check for systemd/load balancers
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "name": "bratgen",
//!   "uptime_seconds": 3600,
//!   "images_generated": 120,
//!   "videos_generated": 14,
//!   "frames_captured": 190,
//!   "errors": 3,
//!   "pending_deletions": 8,
//!   "latency": { "p50_ms": 2450.0, "p95_ms": 9800.0, "p99_ms": 14020.0, ... },
//!   "status": "running",
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::AppState;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for simple liveness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Detailed server status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server version (from Cargo.toml)
    pub version: String,

    /// Server name
    pub name: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Still images produced
    pub images_generated: u64,

    /// Videos produced
    pub videos_generated: u64,

    /// Animation frames captured across all videos
    pub frames_captured: u64,

    /// Failed render requests
    pub errors: u64,

    /// Artifacts waiting for their deletion timer
    pub pending_deletions: usize,

    /// Render latency statistics (percentiles)
    pub latency: LatencyMetrics,

    /// Server status (always "running" if responding)
    pub status: String,

    /// RFC3339 timestamp of when status was generated
    pub timestamp: String,
}

/// Render latency percentile metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// 50th percentile (median) latency in milliseconds
    pub p50_ms: f64,

    /// 95th percentile latency in milliseconds
    pub p95_ms: f64,

    /// 99th percentile latency in milliseconds
    pub p99_ms: f64,

    /// Total number of renders recorded
    pub total_requests: u64,

    /// Mean latency in milliseconds
    pub mean_ms: f64,

    /// Maximum latency recorded in milliseconds
    pub max_ms: f64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe latency histogram for render timings.
///
/// Tracks 1ms to 10 minutes with 3 significant figures; browser renders
/// take seconds, so millisecond resolution is plenty.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create a new latency histogram.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(
                Histogram::new_with_bounds(1, 600_000, 3).expect("Failed to create histogram"),
            ),
        }
    }

    /// Record a duration. Values outside the histogram bounds are saturated.
    pub fn record(&self, duration: Duration) {
        let ms = (duration.as_millis() as u64).max(1);
        self.inner.write().saturating_record(ms);
    }

    /// Get the total count of recorded values.
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Get complete latency metrics.
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        if hist.is_empty() {
            return LatencyMetrics::default();
        }
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64,
            p95_ms: hist.value_at_percentile(95.0) as f64,
            p99_ms: hist.value_at_percentile(99.0) as f64,
            total_requests: hist.len(),
            mean_ms: hist.mean(),
            max_ms: hist.max() as f64,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Service Metrics
// ============================================================================

/// Counters for the render endpoints. All fields are safe to update
/// concurrently.
#[derive(Debug)]
pub struct ServiceMetrics {
    start_time: Instant,
    images_generated: AtomicU64,
    videos_generated: AtomicU64,
    frames_captured: AtomicU64,
    errors: AtomicU64,
    latency: LatencyHistogram,
}

impl ServiceMetrics {
    /// Create a new instance; uptime counts from now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            images_generated: AtomicU64::new(0),
            videos_generated: AtomicU64::new(0),
            frames_captured: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency: LatencyHistogram::new(),
        }
    }

    /// Get the server uptime in seconds.
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record a finished still image
    pub fn record_image(&self, elapsed: Duration) {
        self.images_generated.fetch_add(1, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    /// Record a finished video and the frames it took
    pub fn record_video(&self, frames: usize, elapsed: Duration) {
        self.videos_generated.fetch_add(1, Ordering::Relaxed);
        self.frames_captured
            .fetch_add(frames as u64, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    /// Record a failed render.
    #[inline]
    pub fn record_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Still images produced
    pub fn images_generated(&self) -> u64 {
        self.images_generated.load(Ordering::Relaxed)
    }

    /// Videos produced
    pub fn videos_generated(&self) -> u64 {
        self.videos_generated.load(Ordering::Relaxed)
    }

    /// Frames captured for videos
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::Relaxed)
    }

    /// Failed renders
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Latency metrics
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency.metrics()
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /status`
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Status check requested");

    let metrics = &state.metrics;
    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: metrics.uptime_seconds(),
        images_generated: metrics.images_generated(),
        videos_generated: metrics.videos_generated(),
        frames_captured: metrics.frames_captured(),
        errors: metrics.error_count(),
        pending_deletions: state.store.janitor().pending(),
        latency: metrics.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_default() {
        let health = HealthResponse::default();
        assert_eq!(health.status, "healthy");
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = ServiceMetrics::new();

        metrics.record_image(Duration::from_millis(1200));
        metrics.record_video(4, Duration::from_millis(5400));
        metrics.record_video(2, Duration::from_millis(3100));
        assert_eq!(metrics.record_error(), 1);

        assert_eq!(metrics.images_generated(), 1);
        assert_eq!(metrics.videos_generated(), 2);
        assert_eq!(metrics.frames_captured(), 6);
        assert_eq!(metrics.error_count(), 1);
        assert!(metrics.uptime_seconds() < 1);
    }

    #[test]
    fn test_latency_histogram() {
        let histogram = LatencyHistogram::new();

        for ms in [800, 1200, 2500, 4000, 9000] {
            histogram.record(Duration::from_millis(ms));
        }

        assert_eq!(histogram.count(), 5);
        let metrics = histogram.metrics();
        assert!(metrics.p50_ms > 0.0);
        assert!(metrics.p95_ms >= metrics.p50_ms);
        assert!(metrics.p99_ms >= metrics.p95_ms);
        assert!((8990.0..=9010.0).contains(&metrics.max_ms));
    }

    #[test]
    fn test_latency_outside_bounds_is_kept() {
        let histogram = LatencyHistogram::new();
        histogram.record(Duration::from_micros(10));
        histogram.record(Duration::from_secs(3600));
        assert_eq!(histogram.count(), 2);
    }

    #[test]
    fn test_empty_latency_metrics() {
        let metrics = LatencyHistogram::new().metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.p99_ms, 0.0);
    }

    #[test]
    fn test_server_constants() {
        assert!(!SERVER_VERSION.is_empty());
        assert_eq!(SERVER_NAME, "bratgen");
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_metrics_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(ServiceMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..500 {
                        metrics.record_video(3, Duration::from_millis(10));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(metrics.videos_generated(), 4000);
        assert_eq!(metrics.frames_captured(), 12000);
    }
}
