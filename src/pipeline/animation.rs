//! Word-by-word animation pipeline
//!
//! One frame is captured per incremental word prefix of the sentence, the
//! frames are written to a scratch directory and handed to the encoder. The
//! scratch directory is removed on every exit path, and no video is
//! published unless every frame was captured and the encoder succeeded.

use super::{
    close_quietly, normalize_text, word_prefixes, FrameSequence, PageSession, ScratchDir,
    SessionLauncher, Style, VideoEncoder,
};
use crate::error::{Error, Result};
use crate::storage::{Artifact, ArtifactKind, ArtifactStore};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of a successful animation run
#[derive(Debug, Clone)]
pub struct AnimationOutput {
    /// Published video
    pub artifact: Artifact,
    /// Frames captured, one per word
    pub frames: usize,
}

/// Render `text` as an MP4 revealing one more word per frame
#[instrument(skip(launcher, encoder, store, style))]
pub async fn render_animation(
    launcher: &dyn SessionLauncher,
    encoder: &dyn VideoEncoder,
    store: &ArtifactStore,
    scratch_root: &Path,
    text: &str,
    style: &Style,
    settle: Duration,
) -> Result<AnimationOutput> {
    let text = normalize_text(text)?;
    let prefixes = word_prefixes(text);
    if prefixes.is_empty() {
        return Err(Error::invalid("Text must contain at least one word."));
    }

    let scratch = ScratchDir::create(scratch_root).await?;
    let outcome = render_in(launcher, encoder, store, &scratch, &prefixes, style, settle).await;
    scratch.remove().await;
    outcome
}

async fn render_in(
    launcher: &dyn SessionLauncher,
    encoder: &dyn VideoEncoder,
    store: &ArtifactStore,
    scratch: &ScratchDir,
    prefixes: &[String],
    style: &Style,
    settle: Duration,
) -> Result<AnimationOutput> {
    let mut session = launcher.launch().await?;
    let captured = capture_frames(session.as_mut(), scratch.path(), prefixes, style, settle).await;
    close_quietly(session.as_mut()).await;
    let frames = captured?;

    let artifact = store.allocate(ArtifactKind::Video)?;
    if let Err(err) = encoder.encode(&frames, &artifact.path).await {
        discard_partial(&artifact.path).await;
        return Err(err);
    }

    store.publish(&artifact);
    info!(
        "Rendered animation {} from {} frames",
        artifact.file_name, frames.count
    );
    Ok(AnimationOutput {
        artifact,
        frames: frames.count,
    })
}

async fn capture_frames(
    session: &mut dyn PageSession,
    dir: &Path,
    prefixes: &[String],
    style: &Style,
    settle: Duration,
) -> Result<FrameSequence> {
    let mut frames = FrameSequence {
        dir: dir.to_path_buf(),
        count: 0,
    };

    for (index, prefix) in prefixes.iter().enumerate() {
        session.set_text(prefix).await?;
        session.apply_style(style).await?;
        tokio::time::sleep(settle).await;

        let png = session.capture_frame().await?;
        tokio::fs::write(frames.frame_path(index), &png).await?;
        frames.count += 1;
        debug!("Captured frame {}/{}", index + 1, prefixes.len());
    }

    Ok(frames)
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("Failed to remove partial output {}: {}", path.display(), err),
    }
}
