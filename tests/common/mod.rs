//! Shared fixtures for integration tests: mock browser sessions, a mock
//! encoder and an application wired against temporary directories.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;

use bratgen::config::AppConfig;
use bratgen::error::{CaptureError, EncodeError, Result};
use bratgen::pipeline::{FrameSequence, PageSession, SessionLauncher, Style, VideoEncoder};
use bratgen::storage::{ArtifactStore, Janitor};
use bratgen::AppState;

/// PNG signature prefixed to every mock frame
pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Counters observed by tests
#[derive(Debug, Default)]
pub struct SessionStats {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub captures: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
    pub styles: Mutex<Vec<Style>>,
}

impl SessionStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

/// Launcher producing in-memory sessions
#[derive(Debug, Default, Clone)]
pub struct MockLauncher {
    pub stats: Arc<SessionStats>,
    /// Zero-based capture index that reports a missing target
    pub fail_at_capture: Option<usize>,
    /// Make `launch` itself fail
    pub fail_launch: bool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(capture: usize) -> Self {
        Self {
            fail_at_capture: Some(capture),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(bratgen::error::BrowserError::LaunchFailed("no chrome".into()).into());
        }
        Ok(Box::new(MockSession {
            stats: Arc::clone(&self.stats),
            fail_at_capture: self.fail_at_capture,
            text: String::new(),
        }))
    }
}

struct MockSession {
    stats: Arc<SessionStats>,
    fail_at_capture: Option<usize>,
    text: String,
}

#[async_trait]
impl PageSession for MockSession {
    async fn set_text(&mut self, text: &str) -> Result<()> {
        self.text = text.to_string();
        self.stats.texts.lock().push(text.to_string());
        Ok(())
    }

    async fn apply_style(&mut self, style: &Style) -> Result<()> {
        self.stats.styles.lock().push(style.clone());
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Vec<u8>> {
        let index = self.stats.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail_at_capture == Some(index) {
            return Err(CaptureError::TargetNotFound.into());
        }
        Ok(frame_bytes(&self.text))
    }

    async fn close(&mut self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Bytes the mock session produces for `text`
pub fn frame_bytes(text: &str) -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// Encoder that checks the frame directory and writes a placeholder video
#[derive(Debug, Default, Clone)]
pub struct MockEncoder {
    /// Frames seen on disk per invocation
    pub seen: Arc<Mutex<Vec<usize>>>,
    /// Diagnostic output to fail with
    pub fail_with: Option<String>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<usize> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl VideoEncoder for MockEncoder {
    async fn encode(&self, frames: &FrameSequence, output: &Path) -> Result<()> {
        let on_disk = count_frames(&frames.dir);
        self.seen.lock().push(on_disk);

        // Simulate an encoder that dies after writing a partial file
        tokio::fs::write(output, format!("mp4:{on_disk}")).await?;

        match &self.fail_with {
            Some(stderr) => Err(EncodeError::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Number of `frameNNN.png` files in `dir`
pub fn count_frames(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    let name = e.file_name().to_string_lossy().into_owned();
                    name.starts_with("frame") && name.ends_with(".png")
                })
                .count()
        })
        .unwrap_or(0)
}

/// Number of entries in `dir`
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|e| e.count()).unwrap_or(0)
}

/// Temporary output/scratch directories plus a store rooted there
pub struct TestEnv {
    pub root: TempDir,
    pub config: AppConfig,
    pub store: ArtifactStore,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(600))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(root.path());
        config.artifact_ttl = ttl;
        config.prepare_dirs().expect("prepare dirs");
        let store = ArtifactStore::new(config.output_dir.clone(), Janitor::new(ttl));
        Self {
            root,
            config,
            store,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.config.tmp_dir
    }

    pub fn state(&self, launcher: MockLauncher, encoder: MockEncoder) -> AppState {
        AppState::new(
            self.config.clone(),
            Arc::new(launcher),
            Arc::new(encoder),
            self.store.clone(),
        )
    }

    pub fn app(&self, launcher: MockLauncher, encoder: MockEncoder) -> Router {
        bratgen::router(self.state(launcher, encoder))
    }
}

/// Configuration rooted at `root` with no settle delays
pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig {
        output_dir: root.join("output"),
        tmp_dir: root.join("tmp_brat"),
        static_dir: root.join("static"),
        ..AppConfig::default()
    };
    config.site.image_settle_ms = 0;
    config.site.frame_settle_ms = 0;
    config
}
