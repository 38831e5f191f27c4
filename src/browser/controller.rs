//! Browser lifecycle management
//!
//! This module handles browser launch, shutdown, and page creation. Every
//! render request owns its own controller; nothing is shared or pooled.

use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser viewport width (default: 1536)
    pub width: u32,
    /// Browser viewport height (default: 695)
    pub height: u32,
    /// Enable sandbox (default: false, the service usually runs in a container)
    pub sandbox: bool,
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1536,
            height: 695,
            sandbox: false,
            timeout_ms: 30000,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Handle to an open browser page
#[derive(Clone)]
pub struct PageHandle {
    pub(crate) page: Page,
}

impl PageHandle {
    /// Get the underlying chromiumoxide Page
    pub fn inner(&self) -> &Page {
        &self.page
    }
}

/// High-level browser controller
pub struct BrowserController {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserController {
    /// Launch a browser with custom config
    #[instrument(skip(config))]
    pub async fn with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser: headless={} viewport={}x{}",
            config.headless, config.width, config.height
        );

        let mut builder = CdpBrowserConfig::builder()
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: config.width,
                height: config.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(config.width, config.height);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(BrowserError::ConfigError)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // The handler must be polled for any CDP command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    trace!("Browser handler event error: {}", err);
                }
            }
            debug!("Browser handler finished");
        });

        debug!("Browser launched");

        Ok(Self {
            browser,
            handler: handler_task,
        })
    }

    /// Create a new page/tab
    #[instrument(skip(self))]
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        debug!("Created new page");
        Ok(PageHandle { page })
    }

    /// Close the browser and wait for the handler task to drain
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        debug!("Closing browser");

        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()));

        let _ = self.browser.wait().await;
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handler).await;

        closed.map(|_| debug!("Browser closed"))
    }
}
