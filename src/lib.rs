//! Bratgen - brat-style text images and word-by-word animations
//!
//! This crate runs an HTTP service that drives a headless Chromium session
//! against a public brat text generator, captures the rendered text area and
//! returns download links for a PNG image or an MP4 animation.
//!
//! # Features
//!
//! - **Browser Automation**: Headless browser control via ChromiumOxide (CDP)
//! - **Frame Capture**: Element screenshots with a fixed crop
//! - **Animation**: One frame per word prefix, assembled by `ffmpeg`
//! - **Delivery**: Randomized artifact names with delayed deletion
//!
//! # Architecture
//!
//! ```text
//! HTTP ──▶ handlers ──▶ pipeline ──▶ SessionLauncher (CDP)
//!              │            │
//!              ▼            ▼
//!       ┌────────────┐  ┌──────────────┐
//!       │  download  │  │ VideoEncoder │
//!       └─────┬──────┘  └──────┬───────┘
//!             │                │
//!             ▼                ▼
//!        ArtifactStore ◀── PNG / MP4 ──▶ Janitor (TTL)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bratgen::browser::ChromeLauncher;
//! use bratgen::config::AppConfig;
//! use bratgen::pipeline::{render_image, Style};
//! use bratgen::storage::{ArtifactStore, Janitor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let launcher = ChromeLauncher::new(config.browser.clone(), config.site.clone());
//!     let store = ArtifactStore::new("output", Janitor::new(config.artifact_ttl));
//!
//!     let artifact = render_image(
//!         &launcher,
//!         &store,
//!         "brat summer",
//!         &Style::default(),
//!         config.site.image_settle(),
//!     )
//!     .await?;
//!
//!     println!("Wrote {}", artifact.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use browser::{BrowserController, ChromeLauncher};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use handlers::AppState;
pub use server::router;
pub use storage::{ArtifactStore, Janitor};
