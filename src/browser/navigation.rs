//! Page navigation functionality
//!
//! Navigation with a DOM readiness wait, plus best-effort dismissal of the
//! consent dialog shown by the generator site.

use crate::browser::PageHandle;
use crate::error::{Error, NavigationError, Result};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

/// Resolves once the document has been parsed
const DOM_READY_SCRIPT: &str = r#"
    new Promise(resolve => {
        if (document.readyState !== 'loading') {
            resolve(true);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(true));
        }
    })
"#;

/// Result of a navigation operation
#[derive(Debug)]
pub struct NavigationResult {
    /// Final URL after any redirects
    pub final_url: String,
    /// Navigation duration in milliseconds
    pub duration_ms: u64,
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to a URL. There is no retry: a failed load is reported as is.
    #[instrument(skip(page, options))]
    pub async fn goto(
        page: &PageHandle,
        url: &str,
        options: Option<NavigationOptions>,
    ) -> Result<NavigationResult> {
        let opts = options.unwrap_or_default();
        let start = std::time::Instant::now();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(NavigationError::InvalidUrl(format!(
                "URL must start with http:// or https://: {}",
                url
            ))
            .into());
        }

        info!("Navigating to: {}", url);

        let timeout = Duration::from_millis(opts.timeout_ms);
        tokio::time::timeout(timeout, page.page.goto(url))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))?
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

        tokio::time::timeout(timeout, page.page.evaluate(DOM_READY_SCRIPT))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))?
            .map_err(|e| Error::cdp(e.to_string()))?;

        let final_url = page
            .page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("Navigation complete: {} -> {} in {}ms", url, final_url, duration_ms);

        Ok(NavigationResult {
            final_url,
            duration_ms,
        })
    }

    /// Click the innermost element whose text contains `label`, waiting up
    /// to `timeout_ms` for one to appear.
    ///
    /// Returns whether something was clicked. Absence, timeout and script
    /// failures are logged and otherwise ignored.
    #[instrument(skip(page))]
    pub async fn dismiss_consent(page: &PageHandle, label: &str, timeout_ms: u64) -> bool {
        let script = consent_script(label, timeout_ms);
        let guard = Duration::from_millis(timeout_ms + 1000);

        match tokio::time::timeout(guard, page.page.evaluate(script.as_str())).await {
            Ok(Ok(result)) => {
                let clicked = result.into_value::<bool>().unwrap_or(false);
                if clicked {
                    debug!("Consent dialog dismissed");
                } else {
                    debug!("No consent dialog within {}ms", timeout_ms);
                }
                clicked
            }
            Ok(Err(err)) => {
                warn!("Consent dismissal script failed: {}", err);
                false
            }
            Err(_) => {
                warn!("Consent dismissal timed out after {}ms", guard.as_millis());
                false
            }
        }
    }
}

fn consent_script(label: &str, timeout_ms: u64) -> String {
    let label = serde_json::Value::String(label.to_lowercase()).to_string();
    format!(
        r#"
            new Promise(resolve => {{
                const label = {label};
                const deadline = Date.now() + {timeout_ms};

                function matches(el) {{
                    const text = (el.innerText || el.textContent || '').trim().toLowerCase();
                    return text.includes(label);
                }}

                function attempt() {{
                    for (const el of document.querySelectorAll('body *')) {{
                        if (!matches(el)) continue;
                        // Skip wrappers; the match must not contain a smaller one
                        if (Array.from(el.children).some(matches)) continue;
                        el.click();
                        resolve(true);
                        return;
                    }}
                    if (Date.now() > deadline) {{
                        resolve(false);
                    }} else {{
                        setTimeout(attempt, 100);
                    }}
                }}
                attempt();
            }})
        "#
    )
}
