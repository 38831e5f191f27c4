//! Bratgen HTTP server
//!
//! Renders brat-style text images and animations by driving headless Chromium.

use anyhow::Context;
use bratgen::browser::{BrowserConfig, ChromeLauncher};
use bratgen::config::{AppConfig, DEFAULT_ARTIFACT_TTL_SECS, DEFAULT_SITE_URL};
use bratgen::pipeline::{EncoderConfig, FfmpegEncoder};
use bratgen::storage::{ArtifactStore, Janitor};
use bratgen::AppState;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Bratgen HTTP server
#[derive(Parser, Debug)]
#[command(name = "bratgen")]
#[command(version)]
#[command(about = "Brat-style text image and animation generator")]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Directory generated artifacts are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Parent directory for per-request animation frames
    #[arg(long, env = "TMP_DIR", default_value = "tmp_brat")]
    tmp_dir: PathBuf,

    /// Directory served under /static
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Generator page to drive
    #[arg(long, env = "BRAT_SITE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Path to Chrome/Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,

    /// ffmpeg executable
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    ffmpeg: String,

    /// Seconds a generated file stays downloadable
    #[arg(long, env = "ARTIFACT_TTL_SECS", default_value_t = DEFAULT_ARTIFACT_TTL_SECS)]
    artifact_ttl_secs: u64,

    /// Public base URL used in download links (e.g. https://brat.example)
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let defaults = AppConfig::default();

        let mut browser = BrowserConfig::builder()
            .viewport(defaults.browser.width, defaults.browser.height)
            .sandbox(false);
        if let Some(path) = self.chrome_path {
            browser = browser.chrome_path(path);
        }

        let mut site = defaults.site;
        site.url = self.site_url;

        AppConfig {
            output_dir: self.output_dir,
            tmp_dir: self.tmp_dir,
            static_dir: self.static_dir,
            site,
            browser: browser.build(),
            encoder: EncoderConfig {
                program: self.ffmpeg,
                ..defaults.encoder
            },
            artifact_ttl: Duration::from_secs(self.artifact_ttl_secs),
            public_base_url: self.public_url,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG takes precedence over --verbose
    let default_filter = if args.verbose {
        "debug"
    } else {
        "bratgen=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    let mut config = args.into_config();
    config.site.validate().context("invalid generator site URL")?;
    config
        .prepare_dirs()
        .context("failed to prepare output directories")?;

    let encoder = FfmpegEncoder::new(config.encoder.clone());
    if !encoder.is_available().await {
        tracing::warn!(
            "'{}' could not be executed; /api/bratvid will fail until it is installed",
            config.encoder.program
        );
    }

    let janitor = Janitor::new(config.artifact_ttl);
    let store = ArtifactStore::new(config.output_dir.clone(), janitor.clone());
    let launcher = ChromeLauncher::new(config.browser.clone(), config.site.clone());

    tracing::info!(
        output_dir = %config.output_dir.display(),
        tmp_dir = %config.tmp_dir.display(),
        site = %config.site.url,
        "Bratgen configured"
    );

    let state = AppState::new(config, Arc::new(launcher), Arc::new(encoder), store);
    let app = bratgen::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Bratgen server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let pending = janitor.pending();
    janitor.shutdown();
    tracing::info!(pending, "Shutdown complete, deletion timers cancelled");
    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
