//! Browser automation module
//!
//! This module drives the generator page through ChromiumOxide: browser
//! lifecycle, navigation, the fixed UI interaction sequence and cropped
//! frame capture.

pub mod capture;
pub mod controller;
pub mod navigation;
pub mod session;

pub use capture::{CropSize, ElementBounds, FrameCapturer};
pub use controller::{BrowserConfig, BrowserController, PageHandle};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator};
pub use session::{BratSession, ChromeLauncher};
