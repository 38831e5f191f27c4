//! Still image pipeline

use super::{close_quietly, normalize_text, PageSession, SessionLauncher, Style};
use crate::error::Result;
use crate::storage::{Artifact, ArtifactKind, ArtifactStore};
use std::time::Duration;
use tracing::{info, instrument};

/// Render `text` as one PNG artifact.
///
/// The file is only written once the capture succeeded, and the browser is
/// closed before returning on every path.
#[instrument(skip(launcher, store, style))]
pub async fn render_image(
    launcher: &dyn SessionLauncher,
    store: &ArtifactStore,
    text: &str,
    style: &Style,
    settle: Duration,
) -> Result<Artifact> {
    let text = normalize_text(text)?;

    let mut session = launcher.launch().await?;
    let captured = capture(session.as_mut(), text, style, settle).await;
    close_quietly(session.as_mut()).await;

    let png = captured?;
    let artifact = store.persist(ArtifactKind::Image, &png).await?;
    info!("Rendered image {} ({} bytes)", artifact.file_name, png.len());
    Ok(artifact)
}

async fn capture(
    session: &mut dyn PageSession,
    text: &str,
    style: &Style,
    settle: Duration,
) -> Result<Vec<u8>> {
    session.set_text(text).await?;
    session.apply_style(style).await?;
    tokio::time::sleep(settle).await;
    session.capture_frame().await
}
