//! Frame capture
//!
//! Locates the overlay element, measures it and takes a PNG screenshot of a
//! fixed-size region anchored at the element's top-left corner.

use crate::browser::PageHandle;
use crate::error::{CaptureError, Result};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::ScreenshotParams;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Fixed crop applied to every frame, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSize {
    /// Width of the crop
    pub width: u32,
    /// Height of the crop
    pub height: u32,
}

impl Default for CropSize {
    fn default() -> Self {
        Self {
            width: 500,
            height: 440,
        }
    }
}

/// Element rectangle as reported by the rendering engine (viewport coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBounds {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Measured width
    pub width: f64,
    /// Measured height
    pub height: f64,
}

impl ElementBounds {
    /// Screenshot clip for this element. The crop size is fixed and does not
    /// follow the measured width/height; `scroll` converts viewport
    /// coordinates to document coordinates.
    pub fn clip(&self, crop: CropSize, scroll: (f64, f64)) -> Viewport {
        Viewport {
            x: self.x + scroll.0,
            y: self.y + scroll.1,
            width: crop.width as f64,
            height: crop.height as f64,
            scale: 1.0,
        }
    }

    /// Whether the measured size differs from the crop by more than a pixel
    pub fn mismatches(&self, crop: CropSize) -> bool {
        (self.width - crop.width as f64).abs() > 1.0
            || (self.height - crop.height as f64).abs() > 1.0
    }
}

/// Frame capture functionality
pub struct FrameCapturer;

impl FrameCapturer {
    /// Capture a PNG frame of `selector` clipped to `crop`
    #[instrument(skip(page))]
    pub async fn capture(page: &PageHandle, selector: &str, crop: CropSize) -> Result<Vec<u8>> {
        let element = page
            .page
            .find_element(selector)
            .await
            .map_err(|e| {
                debug!("Capture target {} not found: {}", selector, e);
                CaptureError::TargetNotFound
            })?;

        let bbox = element.bounding_box().await.map_err(|e| {
            debug!("Bounding box unavailable for {}: {}", selector, e);
            CaptureError::BoundingBox
        })?;

        let bounds = ElementBounds {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
        };

        if bounds.mismatches(crop) {
            warn!(
                "Capture target {} measures {:.0}x{:.0}, cropping fixed {}x{}",
                selector, bounds.width, bounds.height, crop.width, crop.height
            );
        }

        let scroll = Self::scroll_offset(page).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(bounds.clip(crop, scroll))
            .build();

        let png = page
            .page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        debug!("Frame captured: {} bytes", png.len());

        Ok(png)
    }

    async fn scroll_offset(page: &PageHandle) -> (f64, f64) {
        page.page
            .evaluate("[window.scrollX, window.scrollY]")
            .await
            .ok()
            .and_then(|v| v.into_value::<(f64, f64)>().ok())
            .unwrap_or((0.0, 0.0))
    }
}
