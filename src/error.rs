//! Error types for Bratgen
//!
//! This module provides the error hierarchy shared by the browser driver,
//! the render pipelines and the HTTP layer, built on `thiserror`.

use thiserror::Error;

/// The main error type for Bratgen operations
#[derive(Error, Debug)]
pub enum Error {
    /// Client supplied input that cannot be rendered
    #[error("{0}")]
    Invalid(String),

    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// UI interaction errors while driving the generator page
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Capture errors
    #[error("{0}")]
    Capture(#[from] CaptureError),

    /// Video encoder errors
    #[error("{0}")]
    Encode(#[from] EncodeError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Errors raised while driving the generator UI
#[derive(Error, Debug)]
pub enum SessionError {
    /// A fixed UI element was not present on the page
    #[error("Element not found: {0}")]
    ElementMissing(String),

    /// Clicking an element failed
    #[error("Failed to click {selector}: {reason}")]
    ClickFailed {
        /// Selector that was clicked
        selector: String,
        /// Underlying CDP message
        reason: String,
    },

    /// An injected script failed to evaluate
    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),
}

/// Frame capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The capture target is absent from the DOM
    #[error("Target element not found.")]
    TargetNotFound,

    /// The rendering engine did not report a bounding box
    #[error("Failed to read element bounding box.")]
    BoundingBox,

    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),
}

/// Video encoder errors
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The encoder process could not be started
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// OS error message
        reason: String,
    },

    /// The encoder exited unsuccessfully; carries its raw diagnostic output
    #[error("{stderr}")]
    Failed {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },
}

/// Result type alias for Bratgen operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid-input error from a string
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::Invalid(msg.into())
    }

    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Whether the error was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Invalid(_))
    }

    /// Whether the error comes from locating or measuring the capture target
    pub fn is_capture_target_error(&self) -> bool {
        matches!(
            self,
            Error::Capture(CaptureError::TargetNotFound | CaptureError::BoundingBox)
        )
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
