//! Render pipelines
//!
//! The still-image and animation pipelines, written against two seams:
//! [`SessionLauncher`]/[`PageSession`] for the browser and [`VideoEncoder`]
//! for frame assembly.
//!
//! ```text
//! text ──▶ validate ──▶ PageSession ──▶ frames ──▶ [VideoEncoder] ──▶ ArtifactStore
//!                          │                           │
//!                          ▼                           ▼
//!                 set_text / apply_style          ffmpeg (MP4)
//!                     capture_frame
//! ```

pub mod animation;
pub mod encode;
pub mod image;
pub mod scratch;

pub use animation::{render_animation, AnimationOutput};
pub use encode::{EncoderConfig, FfmpegEncoder, FrameSequence};
pub use image::render_image;
pub use scratch::ScratchDir;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Optional color overrides applied to the generator page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    /// Background color, e.g. `#000000`
    pub background: Option<String>,
    /// Text color, e.g. `#FFFFFF`
    pub color: Option<String>,
}

impl Style {
    /// Build a style; blank values count as absent
    pub fn new(background: Option<String>, color: Option<String>) -> Self {
        Self {
            background: non_blank(background),
            color: non_blank(color),
        }
    }

    /// Whether any override is set
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.color.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One browser positioned on the generator page
#[async_trait]
pub trait PageSession: Send {
    /// Replace the text in the generator input
    async fn set_text(&mut self, text: &str) -> Result<()>;

    /// Apply color overrides
    async fn apply_style(&mut self, style: &Style) -> Result<()>;

    /// Capture the cropped overlay as PNG bytes
    async fn capture_frame(&mut self) -> Result<Vec<u8>>;

    /// Release the browser. Called exactly once on every exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a new [`PageSession`] per render
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Launch a browser and prepare the generator page
    async fn launch(&self) -> Result<Box<dyn PageSession>>;
}

/// Assembles a numbered frame sequence into a video file
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Encode `frames` into `output`
    async fn encode(&self, frames: &FrameSequence, output: &Path) -> Result<()>;
}

/// Trim the request text, rejecting blank input
pub fn normalize_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::invalid("Text cannot be empty."));
    }
    Ok(text)
}

/// Incremental word prefixes of a sentence: for `"a b c"` that is
/// `["a", "a b", "a b c"]`.
pub fn word_prefixes(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    (1..=words.len()).map(|n| words[..n].join(" ")).collect()
}

/// Close a session, logging rather than surfacing failures
pub(crate) async fn close_quietly(session: &mut dyn PageSession) {
    if let Err(err) = session.close().await {
        warn!("Failed to close browser session: {}", err);
    }
}
