//! Service configuration
//!
//! `AppConfig` gathers everything the server needs at startup: where
//! artifacts and scratch frames live, how the generator page is driven,
//! how the browser is launched and how frames are encoded.

use crate::browser::BrowserConfig;
use crate::error::{NavigationError, Result};
use crate::pipeline::EncoderConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default generator site
pub const DEFAULT_SITE_URL: &str = "https://www.bratgenerator.com/";

/// Default lifetime of a generated artifact before deletion (10 minutes)
pub const DEFAULT_ARTIFACT_TTL_SECS: u64 = 600;

/// Viewport the generator page is rendered at
pub const VIEWPORT_WIDTH: u32 = 1536;
/// Viewport the generator page is rendered at
pub const VIEWPORT_HEIGHT: u32 = 695;

/// Selectors, crop and timing for the generator page
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Page to open
    pub url: String,
    /// Visible text of the consent dialog button
    pub consent_label: String,
    /// How long to look for the consent dialog
    pub consent_timeout_ms: u64,
    /// Control that switches the generator into the white theme
    pub toggle_selector: String,
    /// Overlay holding the rendered text; also the capture target
    pub overlay_selector: String,
    /// Text input the sentence is written into
    pub input_selector: String,
    /// Element whose background color is overridden
    pub background_selector: String,
    /// Element whose text color is overridden
    pub text_selector: String,
    /// Crop width in CSS pixels
    pub crop_width: u32,
    /// Crop height in CSS pixels
    pub crop_height: u32,
    /// Re-layout delay before a still image capture
    pub image_settle_ms: u64,
    /// Re-layout delay before each animation frame
    pub frame_settle_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            url: DEFAULT_SITE_URL.to_string(),
            consent_label: "Accept".to_string(),
            consent_timeout_ms: 3000,
            toggle_selector: "#toggleButtonWhite".to_string(),
            overlay_selector: "#textOverlay".to_string(),
            input_selector: "#textInput".to_string(),
            background_selector: ".node__content.clearfix".to_string(),
            text_selector: ".textFitted".to_string(),
            crop_width: 500,
            crop_height: 440,
            image_settle_ms: 500,
            frame_settle_ms: 200,
        }
    }
}

impl SiteProfile {
    /// Settle delay before a still capture
    pub fn image_settle(&self) -> Duration {
        Duration::from_millis(self.image_settle_ms)
    }

    /// Settle delay before each animation frame
    pub fn frame_settle(&self) -> Duration {
        Duration::from_millis(self.frame_settle_ms)
    }

    /// Check the site URL is an absolute http(s) URL
    pub fn validate(&self) -> Result<()> {
        let parsed =
            url::Url::parse(&self.url).map_err(|e| NavigationError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(NavigationError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, self.url
            ))
            .into()),
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory generated artifacts are written to
    pub output_dir: PathBuf,
    /// Parent directory for per-request frame directories
    pub tmp_dir: PathBuf,
    /// Directory mounted at `/static`
    pub static_dir: PathBuf,
    /// Generator page profile
    pub site: SiteProfile,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Video encoder settings
    pub encoder: EncoderConfig,
    /// How long an artifact stays downloadable
    pub artifact_ttl: Duration,
    /// Base URL used in download links instead of the request's Host header
    pub public_base_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            tmp_dir: PathBuf::from("tmp_brat"),
            static_dir: PathBuf::from("static"),
            site: SiteProfile::default(),
            browser: BrowserConfig::builder()
                .viewport(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
                .sandbox(false)
                .build(),
            encoder: EncoderConfig::default(),
            artifact_ttl: Duration::from_secs(DEFAULT_ARTIFACT_TTL_SECS),
            public_base_url: None,
        }
    }
}

impl AppConfig {
    /// Create directories for output and scratch frames, substituting the
    /// fallback locations chosen by [`ensure_dir`].
    pub fn prepare_dirs(&mut self) -> Result<()> {
        self.output_dir = ensure_dir(&self.output_dir)?;
        self.tmp_dir = ensure_dir(&self.tmp_dir)?;
        Ok(())
    }
}

/// Create `path` with world read/write/execute permissions.
///
/// If that fails the directory is created under the system temp dir using
/// the same basename instead, and the fallback path is returned.
pub fn ensure_dir(path: &Path) -> Result<PathBuf> {
    match create_open_dir(path) {
        Ok(()) => {
            debug!("Using directory {}", path.display());
            Ok(path.to_path_buf())
        }
        Err(err) => {
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "bratgen".into());
            let fallback = std::env::temp_dir().join(name);
            warn!(
                "Cannot prepare {} ({}), falling back to {}",
                path.display(),
                err,
                fallback.display()
            );
            create_open_dir(&fallback)?;
            Ok(fallback)
        }
    }
}

fn create_open_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))?;
    }
    Ok(())
}
