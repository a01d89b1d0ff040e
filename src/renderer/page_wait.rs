//! Post-navigation waiting and page inspection
//!
//! `page.goto()` returns once the main document has loaded, not once
//! client-side rendering has finished. The network is treated as idle when
//! the document is complete and the number of loaded resources has stayed
//! unchanged for [`NETWORK_IDLE_WINDOW_MS`].

use chromiumoxide::Page;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::utils::constants::NETWORK_IDLE_WINDOW_MS;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const LOAD_STATE_SCRIPT: &str = r#"
(() => ({
    readyState: document.readyState,
    resources: performance.getEntriesByType('resource').length
}))()
"#;

const STATUS_SCRIPT: &str = r#"
(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && nav.responseStatus ? nav.responseStatus : null;
})()
"#;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadState {
    ready_state: String,
    resources: u64,
}

/// Tracks the quiet-window condition across polls
#[derive(Debug)]
pub(crate) struct IdleTracker {
    window: Duration,
    last_count: Option<u64>,
    stable_since: Option<Instant>,
}

impl IdleTracker {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_count: None,
            stable_since: None,
        }
    }

    /// Feed one observation; returns true once the page has been quiet long enough
    pub(crate) fn observe(&mut self, complete: bool, resources: u64, now: Instant) -> bool {
        if !complete {
            self.last_count = None;
            self.stable_since = None;
            return false;
        }
        if self.last_count != Some(resources) {
            self.last_count = Some(resources);
            self.stable_since = Some(now);
            return false;
        }
        self.stable_since
            .is_some_and(|since| now.duration_since(since) >= self.window)
    }
}

/// Wait until the page is network-idle, for at most `budget`.
///
/// Running out of budget is not an error: the caller reads whatever has
/// rendered by then.
pub async fn wait_for_network_idle(page: &Page, budget: Duration) {
    let start = Instant::now();
    let deadline = start + budget;
    let mut tracker = IdleTracker::new(Duration::from_millis(NETWORK_IDLE_WINDOW_MS));

    loop {
        let now = Instant::now();
        if now >= deadline {
            debug!(
                "Network idle not reached within {:?}, proceeding with current document",
                budget
            );
            return;
        }

        match page.evaluate(LOAD_STATE_SCRIPT).await {
            Ok(result) => match result.into_value::<LoadState>() {
                Ok(state) => {
                    if tracker.observe(state.ready_state == "complete", state.resources, now) {
                        debug!(
                            "Network idle after {:.2}s ({} resources)",
                            start.elapsed().as_secs_f64(),
                            state.resources
                        );
                        return;
                    }
                }
                Err(e) => trace!("Unexpected load-state payload: {}", e),
            },
            Err(e) => trace!("Failed to read load state: {}, retrying", e),
        }

        tokio::time::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())))
            .await;
    }
}

/// Main-document HTTP status from Navigation Timing, if the engine exposes it
pub async fn navigation_status(page: &Page) -> Option<u16> {
    page.evaluate(STATUS_SCRIPT)
        .await
        .ok()
        .and_then(|v| v.into_value::<Option<u16>>().ok())
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_requires_quiet_window() {
        let mut tracker = IdleTracker::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert!(!tracker.observe(false, 3, t0));
        assert!(!tracker.observe(true, 3, t0));
        assert!(!tracker.observe(true, 3, t0 + Duration::from_millis(300)));
        // New resource resets the window
        assert!(!tracker.observe(true, 4, t0 + Duration::from_millis(400)));
        assert!(!tracker.observe(true, 4, t0 + Duration::from_millis(800)));
        assert!(tracker.observe(true, 4, t0 + Duration::from_millis(900)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_document_resets_tracker() {
        let mut tracker = IdleTracker::new(Duration::from_millis(500));
        let t0 = Instant::now();
        tracker.observe(true, 2, t0);
        assert!(!tracker.observe(false, 2, t0 + Duration::from_millis(600)));
        assert!(!tracker.observe(true, 2, t0 + Duration::from_millis(700)));
    }
}
