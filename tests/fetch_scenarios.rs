//! End-to-end fetches through the service context: queue, executor and classifier

mod common;

use common::{ScriptedSite, service};
use kodegen_tools_pagefetch::fetch_executor::{ChallengeSignal, ErrorKind};

#[tokio::test]
async fn challenge_page_is_blocked_after_one_navigation() {
    let url = "https://district.test/calendar";
    let site = ScriptedSite::new().page(
        url,
        200,
        "<html><body><h2>Checking your browser before accessing district.test</h2></body></html>",
    );
    let service = service(site.clone());

    let outcome = service.fetch(service.fetch_request(url)).await.unwrap();

    assert_eq!(site.navigations_to(url), 1);
    assert!(!outcome.success);
    assert!(outcome.blocked);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Blocked));
    assert_eq!(outcome.attempts, 1);
    let signal = outcome.block_signal.as_ref().unwrap();
    assert_eq!(signal.signal, ChallengeSignal::Cloudflare);

    let status = service.status();
    assert_eq!(status.blocked, 1);
    assert_eq!(status.queue.retries, 0);
}

#[tokio::test]
async fn each_blocked_fetch_navigates_once() {
    let url = "https://district.test/guarded";
    let site = ScriptedSite::new().page(url, 403, "<p>Checking your browser</p>");
    let service = service(site.clone());

    service.fetch(service.fetch_request(url)).await.unwrap();
    service.fetch(service.fetch_request(url)).await.unwrap();

    assert_eq!(site.navigations_to(url), 2);
    assert_eq!(service.status().blocked, 2);
    assert_eq!(service.status().queue.retries, 0);
}

#[tokio::test]
async fn unreachable_host_is_retried_until_exhausted() {
    let url = "https://unreachable.test/";
    let site = ScriptedSite::new();
    let service = service(site.clone());
    let max_attempts = service.config().queue.max_retries + 1;

    let outcome = service.fetch(service.fetch_request(url)).await.unwrap();

    assert_eq!(site.navigations_to(url), max_attempts);
    assert!(!outcome.success);
    assert!(!outcome.blocked);
    assert_eq!(outcome.error_kind, Some(ErrorKind::NetworkError));
    assert_eq!(outcome.attempts, max_attempts);
    assert_eq!(service.status().queue.retries, u64::from(max_attempts - 1));
}

#[tokio::test]
async fn missing_page_is_terminal() {
    let url = "https://district.test/gone";
    let service = service(ScriptedSite::new().page(url, 404, "<h1>Page not found</h1>"));

    let outcome = service.fetch(service.fetch_request(url)).await.unwrap();

    assert_eq!(outcome.error_kind, Some(ErrorKind::NotFound));
    assert_eq!(outcome.status_code, Some(404));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn successful_fetch_returns_both_renditions() {
    let url = "https://district.test/bell-schedule";
    let html = r#"<html><head><title>Bells</title><script>track()</script></head>
        <body><nav>Menu</nav><main><h1>Bell Schedule</h1><p>1st period 8:05 AM</p></main></body></html>"#;
    let service = service(ScriptedSite::new().page(url, 200, html));

    let outcome = service.fetch(service.fetch_request(url)).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.raw_content.as_deref(), Some(html));
    let markdown = outcome.sanitized_content.unwrap();
    assert!(markdown.contains("Bell Schedule"));
    assert!(markdown.contains("8:05 AM"));
    assert!(!markdown.contains("track()"));
    assert_eq!(service.status().processed, 1);
}

#[tokio::test]
async fn malformed_url_is_rejected_before_queueing() {
    let site = ScriptedSite::new();
    let service = service(site.clone());

    let err = service
        .fetch(service.fetch_request("district.test/no-scheme"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("district.test/no-scheme"));
    assert_eq!(service.status().queue.depth, 0);
    assert_eq!(site.total_navigations(), 0);
}

#[tokio::test]
async fn fetch_after_shutdown_reports_shutting_down() {
    let url = "https://district.test/";
    let site = ScriptedSite::new().page(url, 200, "<p>ok</p>");
    let service = service(site.clone());

    service.shutdown().await;
    service.shutdown().await;
    let outcome = service.fetch(service.fetch_request(url)).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("shutting down"));
    assert_eq!(site.total_navigations(), 0);
    assert!(service.health().shutting_down);
    assert!(!service.health().healthy);
}
