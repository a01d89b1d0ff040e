//! Live browser checks. These launch a real Chrome and are ignored by default:
//!
//! ```sh
//! cargo test --test chrome_capture -- --ignored
//! ```

use kodegen_tools_pagefetch::config::ServiceConfig;
use kodegen_tools_pagefetch::document_capture::CaptureRequest;
use kodegen_tools_pagefetch::service::ServiceContext;

const CONSENT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Bell Schedule</title>
    <style>
        #cookie-notice { position: fixed; inset: 0; z-index: 9999; background: rgba(0,0,0,.6); }
    </style>
</head>
<body>
    <h1>Bell Schedule</h1>
    <table><tr><td>Period 1</td><td>8:00 AM - 8:50 AM</td></tr></table>
    <div id="cookie-notice">
        <p>We use cookies.</p>
        <button id="accept-cookies" onclick="document.getElementById('cookie-notice').remove()">Accept</button>
    </div>
</body>
</html>"#;

fn live_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.queue.min_origin_interval_ms = 0;
    config.capture.capture_delay_ms = 0;
    config.fetch.navigation_timeout_secs = 20;
    config.capture.navigation_timeout_secs = 20;
    config
}

#[tokio::test]
#[ignore = "launches a real Chrome"]
async fn consent_overlay_is_dismissed_before_export() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/bells")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(CONSENT_PAGE)
        .create_async()
        .await;

    let service = ServiceContext::new(live_config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/bells", server.url());

    let result = service
        .capture(&CaptureRequest::new([url]).with_output_dir(dir.path()))
        .await
        .unwrap();
    service.shutdown().await;

    let record = &result.records[0];
    assert!(record.success, "capture failed: {:?}", record.error);
    assert!(record.modals_dismissed);
    assert!(record.bytes > 0);
    let bytes = std::fs::read(record.output_path.as_ref().unwrap()).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
#[ignore = "launches a real Chrome"]
async fn live_fetch_returns_markdown() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/bells")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(CONSENT_PAGE)
        .create_async()
        .await;

    let service = ServiceContext::new(live_config()).unwrap();
    let url = format!("{}/bells", server.url());

    let outcome = service.fetch(service.fetch_request(&url)).await.unwrap();
    service.shutdown().await;

    assert!(outcome.success, "fetch failed: {:?}", outcome.error);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome.sanitized_content.unwrap().contains("8:00 AM"));
    assert_eq!(service.status().pool.launched_total, 1);
}
