//! Browser module tests
//!
//! These tests verify the browser configuration, capture geometry and page
//! scripts. Tests that drive a real Chrome/Chromium instance are marked
//! `#[ignore]`; run them with `cargo test -- --ignored`.

use bratgen::browser::session::{fill_script, style_script};
use bratgen::browser::{
    BrowserConfig, BrowserController, ChromeLauncher, CropSize, ElementBounds, NavigationOptions,
    NavigationResult,
};
use bratgen::config::{AppConfig, SiteProfile};
use bratgen::pipeline::{SessionLauncher, Style};

#[test]
fn test_browser_config_default() {
    let config = BrowserConfig::default();
    assert!(config.headless);
    assert_eq!(config.width, 1536);
    assert_eq!(config.height, 695);
    assert!(!config.sandbox);
    assert_eq!(config.timeout_ms, 30000);
    assert!(config.chrome_path.is_none());
    assert!(config.extra_args.is_empty());
}

#[test]
fn test_browser_config_builder() {
    let config = BrowserConfig::builder()
        .headless(false)
        .viewport(1280, 720)
        .sandbox(true)
        .timeout_ms(60000)
        .chrome_path("/usr/bin/chromium")
        .arg("--disable-gpu")
        .arg("--no-first-run")
        .build();

    assert!(!config.headless);
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, 720);
    assert!(config.sandbox);
    assert_eq!(config.timeout_ms, 60000);
    assert_eq!(config.chrome_path.as_deref(), Some("/usr/bin/chromium"));
    assert_eq!(config.extra_args.len(), 2);
}

#[test]
fn test_crop_size_default() {
    let crop = CropSize::default();
    assert_eq!(crop.width, 500);
    assert_eq!(crop.height, 440);
}

#[test]
fn test_clip_is_anchored_at_element_corner() {
    let bounds = ElementBounds {
        x: 518.0,
        y: 127.5,
        width: 500.0,
        height: 440.0,
    };

    let clip = bounds.clip(CropSize::default(), (0.0, 0.0));
    assert_eq!(clip.x, 518.0);
    assert_eq!(clip.y, 127.5);
    assert_eq!(clip.width, 500.0);
    assert_eq!(clip.height, 440.0);
    assert_eq!(clip.scale, 1.0);
    assert!(!bounds.mismatches(CropSize::default()));
}

#[test]
fn test_clip_ignores_measured_size() {
    let bounds = ElementBounds {
        x: 10.0,
        y: 20.0,
        width: 320.0,
        height: 900.0,
    };

    let clip = bounds.clip(CropSize::default(), (0.0, 150.0));
    assert_eq!((clip.width, clip.height), (500.0, 440.0));
    assert_eq!(clip.y, 170.0);
    assert!(bounds.mismatches(CropSize::default()));
}

#[test]
fn test_navigation_options_default() {
    let opts = NavigationOptions::default();
    assert_eq!(opts.timeout_ms, 30000);
}

#[test]
fn test_navigation_result_structure() {
    let result = NavigationResult {
        final_url: "https://www.bratgenerator.com/".to_string(),
        duration_ms: 1500,
    };

    assert_eq!(result.final_url, "https://www.bratgenerator.com/");
    assert_eq!(result.duration_ms, 1500);
}

#[test]
fn test_page_scripts_use_site_selectors() {
    let site = SiteProfile::default();

    let fill = fill_script(&site.input_selector, "brat");
    assert!(fill.contains(r##""#textInput""##));
    assert!(fill.contains(r#""brat""#));

    let style = style_script(&site, &Style::new(Some("#ff0000".into()), None));
    assert!(style.contains(r#"".node__content.clearfix""#));
    assert!(style.contains(r#"".textFitted""#));
    assert!(style.contains(r##""background":"#ff0000""##));
    assert!(style.contains(r#""color":null"#));
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium"]
async fn test_controller_launch_and_close() {
    let controller = BrowserController::with_config(BrowserConfig::default())
        .await
        .expect("launch");
    let page = controller.new_page().await.expect("page");
    page.inner().goto("about:blank").await.expect("goto");
    controller.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium and network access"]
async fn test_live_generator_capture() {
    let config = AppConfig::default();
    let launcher = ChromeLauncher::new(config.browser.clone(), config.site.clone());

    let mut session = launcher.launch().await.expect("launch");
    session.set_text("brat summer").await.expect("set text");
    session
        .apply_style(&Style::new(Some("#000000".into()), Some("#ffffff".into())))
        .await
        .expect("style");
    tokio::time::sleep(config.site.image_settle()).await;

    let png = session.capture_frame().await.expect("capture");
    session.close().await.expect("close");

    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}
