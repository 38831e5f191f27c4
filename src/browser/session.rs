//! Generator page session
//!
//! Drives the generator UI through its fixed interaction sequence and
//! exposes it to the pipelines as a [`PageSession`].

use crate::browser::capture::{CropSize, FrameCapturer};
use crate::browser::navigation::{NavigationOptions, PageNavigator};
use crate::browser::{BrowserConfig, BrowserController, PageHandle};
use crate::config::SiteProfile;
use crate::error::{Result, SessionError};
use crate::pipeline::{PageSession, SessionLauncher, Style};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A live browser positioned on the generator page
pub struct BratSession {
    controller: Option<BrowserController>,
    page: PageHandle,
    site: Arc<SiteProfile>,
}

impl BratSession {
    /// Launch a browser, open the generator and prepare the text input
    #[instrument(skip_all)]
    pub async fn open(browser: &BrowserConfig, site: Arc<SiteProfile>) -> Result<Self> {
        let controller = BrowserController::with_config(browser.clone()).await?;

        match Self::prepare(&controller, browser, &site).await {
            Ok(page) => Ok(Self {
                controller: Some(controller),
                page,
                site,
            }),
            Err(err) => {
                if let Err(close_err) = controller.close().await {
                    warn!("Failed to close browser after setup error: {}", close_err);
                }
                Err(err)
            }
        }
    }

    async fn prepare(
        controller: &BrowserController,
        browser: &BrowserConfig,
        site: &SiteProfile,
    ) -> Result<PageHandle> {
        let page = controller.new_page().await?;

        let nav = NavigationOptions {
            timeout_ms: browser.timeout_ms,
        };
        let loaded = PageNavigator::goto(&page, &site.url, Some(nav)).await?;
        debug!("Generator loaded from {} in {}ms", loaded.final_url, loaded.duration_ms);

        PageNavigator::dismiss_consent(&page, &site.consent_label, site.consent_timeout_ms).await;

        for selector in [
            &site.toggle_selector,
            &site.overlay_selector,
            &site.input_selector,
        ] {
            click(&page, selector).await?;
        }

        debug!("Generator page ready");
        Ok(page)
    }
}

async fn click(page: &PageHandle, selector: &str) -> Result<()> {
    let element = page
        .page
        .find_element(selector)
        .await
        .map_err(|_| SessionError::ElementMissing(selector.to_string()))?;

    element.click().await.map_err(|e| SessionError::ClickFailed {
        selector: selector.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

async fn run_script(page: &PageHandle, script: &str) -> Result<serde_json::Value> {
    let result = page
        .page
        .evaluate(script)
        .await
        .map_err(|e| SessionError::ScriptFailed(e.to_string()))?;

    Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
}

/// Script that replaces the input's value and notifies the page's listeners
pub fn fill_script(selector: &str, text: &str) -> String {
    format!(
        r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                el.focus();
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
        "#,
        selector = json!(selector),
        text = json!(text),
    )
}

/// Script that applies the optional color overrides through the page's jQuery
pub fn style_script(site: &SiteProfile, style: &Style) -> String {
    let data = json!({
        "background": style.background,
        "color": style.color,
    });
    format!(
        r#"
            ((data) => {{
                if (data.background) $({background_selector}).css('background-color', data.background);
                if (data.color) $({text_selector}).css('color', data.color);
                return true;
            }})({data})
        "#,
        background_selector = json!(site.background_selector),
        text_selector = json!(site.text_selector),
    )
}

#[async_trait]
impl PageSession for BratSession {
    async fn set_text(&mut self, text: &str) -> Result<()> {
        let filled = run_script(&self.page, &fill_script(&self.site.input_selector, text)).await?;
        if filled != serde_json::Value::Bool(true) {
            return Err(SessionError::ElementMissing(self.site.input_selector.clone()).into());
        }
        Ok(())
    }

    async fn apply_style(&mut self, style: &Style) -> Result<()> {
        run_script(&self.page, &style_script(&self.site, style)).await?;
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Vec<u8>> {
        let crop = CropSize {
            width: self.site.crop_width,
            height: self.site.crop_height,
        };
        FrameCapturer::capture(&self.page, &self.site.overlay_selector, crop).await
    }

    async fn close(&mut self) -> Result<()> {
        match self.controller.take() {
            Some(controller) => controller.close().await,
            None => Ok(()),
        }
    }
}

/// Opens a fresh Chromium-backed [`BratSession`] for each request
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    browser: BrowserConfig,
    site: Arc<SiteProfile>,
}

impl ChromeLauncher {
    /// Create a launcher for the given browser settings and site
    pub fn new(browser: BrowserConfig, site: SiteProfile) -> Self {
        Self {
            browser,
            site: Arc::new(site),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        let session = BratSession::open(&self.browser, Arc::clone(&self.site)).await?;
        Ok(Box::new(session))
    }
}
