//! MP4 assembly through the system `ffmpeg` binary

use super::VideoEncoder;
use crate::error::{EncodeError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, instrument};

/// printf-style name of frame `i` inside a frame directory
pub const FRAME_PATTERN: &str = "frame%03d.png";

/// File name of the frame at `index` (zero-based)
pub fn frame_file_name(index: usize) -> String {
    format!("frame{index:03}.png")
}

/// Encoder invocation settings
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Encoder executable
    pub program: String,
    /// Input frame rate; one frame is shown per word
    pub input_framerate: String,
    /// Output frame rate after resampling
    pub output_fps: u32,
    /// Video codec
    pub codec: String,
    /// Codec preset
    pub preset: String,
    /// Output pixel format
    pub pixel_format: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            input_framerate: "1.428".to_string(),
            output_fps: 30,
            codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// A directory of `frame000.png`, `frame001.png`, ... frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    /// Directory holding the frames
    pub dir: PathBuf,
    /// Number of frames written
    pub count: usize,
}

impl FrameSequence {
    /// Input pattern handed to the encoder
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(FRAME_PATTERN)
    }

    /// Path of the frame at `index`
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }
}

/// Encoder driving an external `ffmpeg` process
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    cfg: EncoderConfig,
}

impl FfmpegEncoder {
    /// Create an encoder with the given settings
    pub fn new(cfg: EncoderConfig) -> Self {
        Self { cfg }
    }

    /// Full argument list for encoding `frames` into `output`
    pub fn args(&self, frames: &FrameSequence, output: &Path) -> Vec<OsString> {
        let filters = format!("scale=trunc(iw/2)*2:trunc(ih/2)*2,fps={}", self.cfg.output_fps);
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-framerate".into(),
            self.cfg.input_framerate.clone().into(),
            "-i".into(),
        ];
        args.push(frames.pattern().into_os_string());
        args.extend(
            [
                "-vf",
                filters.as_str(),
                "-c:v",
                self.cfg.codec.as_str(),
                "-preset",
                self.cfg.preset.as_str(),
                "-pix_fmt",
                self.cfg.pixel_format.as_str(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Whether the encoder binary can be executed
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.cfg.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    #[instrument(skip(self), fields(frames = frames.count))]
    async fn encode(&self, frames: &FrameSequence, output: &Path) -> Result<()> {
        let args = self.args(frames, output);
        debug!("Running {} {:?}", self.cfg.program, args);

        let result = tokio::process::Command::new(&self.cfg.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EncodeError::Spawn {
                program: self.cfg.program.clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            return Err(EncodeError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            }
            .into());
        }

        info!("Encoded {} frames into {}", frames.count, output.display());
        Ok(())
    }
}
