//! Single-attempt page fetch: render, classify, sanitize
//!
//! The executor never retries and never throws: every attempt becomes a
//! [`FetchOutcome`] whose [`ErrorKind`] tells the scheduling queue whether a
//! retry is allowed. Detected access-control challenges are reported as
//! blocked and left alone.

pub mod block_detection;
pub mod outcome;
pub mod sanitizer;

pub use block_detection::{ChallengeSignal, SecurityBlockSignal};
pub use outcome::{ErrorKind, FetchOutcome, FetchRequest};
pub use sanitizer::{SanitizedContent, sanitize};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::renderer::{PageRenderer, RenderError, RenderOptions};

/// Status codes treated as a terminal not-found
const NOT_FOUND_STATUSES: &[u16] = &[404, 410];

/// Map a render failure to its retry classification
pub fn classify_render_error(err: &RenderError) -> ErrorKind {
    match err {
        RenderError::Timeout { .. } => ErrorKind::Timeout,
        RenderError::Navigation(_) | RenderError::Engine(_) | RenderError::Pool(_) => {
            ErrorKind::NetworkError
        }
    }
}

/// Runs one fetch attempt through a [`PageRenderer`]
#[derive(Debug, Clone)]
pub struct FetchExecutor<R> {
    renderer: R,
}

impl<R: PageRenderer> FetchExecutor<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Render `request.url` once and classify the result
    pub async fn execute(&self, request: &FetchRequest) -> FetchOutcome {
        let start = Instant::now();
        let options = RenderOptions {
            timeout: request.timeout,
            settle_delay: request.settle_delay,
            export: request.export.clone(),
        };

        let page = match self.renderer.render(&request.url, &options).await {
            Ok(page) => page,
            Err(e) => {
                let kind = classify_render_error(&e);
                debug!("Fetch of {} failed ({}): {}", request.url, kind, e);
                return FetchOutcome::failure(&request.url, kind, e.to_string())
                    .with_elapsed(start.elapsed());
            }
        };

        let signal = block_detection::detect(&page.html, page.status);
        if signal.is_blocked() {
            warn!(
                "Access-control challenge at {} ({:?}, rule {:?}, status {:?}); not retrying",
                request.url, signal.signal, signal.matched_rule, signal.status_code
            );
            let mut outcome = FetchOutcome::failure(
                &request.url,
                ErrorKind::Blocked,
                format!("blocked by {:?} challenge", signal.signal),
            );
            outcome.final_url = Some(page.final_url);
            outcome.status_code = page.status;
            outcome.title = page.title;
            outcome.block_signal = Some(signal);
            return outcome.with_elapsed(start.elapsed());
        }

        if let Some(status) = page.status
            && NOT_FOUND_STATUSES.contains(&status)
        {
            info!("Not found: {} (status {})", request.url, status);
            let mut outcome =
                FetchOutcome::failure(&request.url, ErrorKind::NotFound, format!("HTTP {status}"));
            outcome.final_url = Some(page.final_url);
            outcome.status_code = Some(status);
            return outcome.with_elapsed(start.elapsed());
        }

        let content = sanitize(&page.html);
        debug!(
            "Fetched {} ({} bytes raw, {} bytes markdown)",
            page.final_url,
            page.html.len(),
            content.markdown.len()
        );

        FetchOutcome {
            success: true,
            url: request.url.clone(),
            final_url: Some(page.final_url),
            status_code: page.status,
            title: page.title,
            raw_content: Some(page.html),
            sanitized_content: Some(content.markdown),
            document: page.document,
            ..FetchOutcome::default()
        }
        .with_elapsed(start.elapsed())
    }
}
