//! Chromium-backed renderer
//!
//! Each render leases an engine, opens an isolated context tagged with the
//! client identity, navigates under the timeout, waits for network idle and
//! reads the document. The context is disposed and the lease released on
//! every exit path; engine-level failures on a dead engine mark the lease
//! crashed so the pool evicts it.

use chromiumoxide::Page;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::overlay::{auto_dismiss_dialogs, dismiss_overlays};
use super::page_timeout::with_page_timeout;
use super::page_wait::{navigation_status, wait_for_network_idle};
use super::{
    CaptureRenderOptions, CapturedDocument, DocumentRenderer, PageRenderer, RenderError,
    RenderOptions, RenderedPage,
};
use crate::browser_pool::{
    BrowserPool, ChromiumLauncher, Engine, IsolatedContext, PooledBrowserGuard,
    create_isolated_context,
};
use crate::utils::constants::CLIENT_IDENTITY;

/// Renderer over a pool of Chromium engines
#[derive(Clone)]
pub struct ChromiumRenderer {
    pool: Arc<BrowserPool<ChromiumLauncher>>,
    identity: String,
}

impl ChromiumRenderer {
    pub fn new(pool: Arc<BrowserPool<ChromiumLauncher>>) -> Self {
        Self {
            pool,
            identity: CLIENT_IDENTITY.to_string(),
        }
    }

    pub fn pool(&self) -> &Arc<BrowserPool<ChromiumLauncher>> {
        &self.pool
    }

    /// Lease an engine and open an isolated context on it
    async fn open(&self) -> Result<(PooledBrowserGuard<ChromiumLauncher>, IsolatedContext), RenderError> {
        let mut lease = self.pool.acquire().await?;
        let Some(browser) = lease.engine().map(|engine| Arc::clone(engine.browser())) else {
            return Err(RenderError::Engine("lease carried no engine".into()));
        };

        match create_isolated_context(&browser, &self.identity).await {
            Ok(context) => Ok((lease, context)),
            Err(e) => {
                let error = RenderError::from(e);
                settle_lease(&mut lease, Some(&error)).await;
                Err(error)
            }
        }
    }
}

/// Budget for the post-failure health check; a hung engine never answers
const HEALTH_CHECK_BUDGET: Duration = Duration::from_secs(5);

async fn responds_within(check: impl Future<Output = bool>, budget: Duration) -> bool {
    tokio::time::timeout(budget, check).await.unwrap_or(false)
}

/// Evict the leased engine when a timeout or engine error left it unresponsive
async fn settle_lease(lease: &mut PooledBrowserGuard<ChromiumLauncher>, error: Option<&RenderError>) {
    let Some(error) = error.filter(|e| e.implicates_engine()) else {
        return;
    };
    let alive = match lease.engine() {
        Some(engine) => responds_within(engine.is_alive(), HEALTH_CHECK_BUDGET).await,
        None => false,
    };
    if !alive {
        warn!("Browser {:?} is unresponsive after {}", lease.id(), error);
        lease.mark_crashed();
    }
}

fn remaining(start: Instant, budget: Duration) -> Duration {
    budget.saturating_sub(start.elapsed())
}

async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), RenderError> {
    let start = Instant::now();
    with_page_timeout(page.goto(url), timeout, "navigation").await?;
    wait_for_network_idle(page, remaining(start, timeout)).await;
    Ok(())
}

async fn render_in(page: &Page, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError> {
    navigate(page, url, options.timeout).await?;

    if !options.settle_delay.is_zero() {
        tokio::time::sleep(options.settle_delay).await;
    }

    let status = navigation_status(page).await;
    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| url.to_string());
    let html = page.content().await.map_err(RenderError::engine)?;
    let title = page.get_title().await.ok().flatten();

    let document = match &options.export {
        Some(doc) => Some(
            page.pdf(doc.to_print_params())
                .await
                .map_err(RenderError::engine)?,
        ),
        None => None,
    };

    debug!(
        "Rendered {} (status {:?}, {} bytes of HTML)",
        final_url,
        status,
        html.len()
    );

    Ok(RenderedPage {
        requested_url: url.to_string(),
        final_url,
        status,
        html,
        title,
        document,
    })
}

async fn capture_in(
    page: &Page,
    url: &str,
    options: &CaptureRenderOptions,
) -> Result<CapturedDocument, RenderError> {
    let dialogs = auto_dismiss_dialogs(page).await;

    let result = async {
        navigate(page, url, options.timeout).await?;
        let overlay_dismissed = dismiss_overlays(page).await;
        let title = page.get_title().await.ok().flatten();
        let bytes = page
            .pdf(options.document.to_print_params())
            .await
            .map_err(RenderError::engine)?;
        Ok::<_, RenderError>(CapturedDocument {
            bytes,
            title,
            overlay_dismissed,
        })
    }
    .await;

    if let Some(task) = dialogs {
        task.abort();
    }
    result
}

impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let (mut lease, context) = self.open().await?;
        let result = match context.page() {
            Some(page) => render_in(page, url, options).await,
            None => Err(RenderError::Engine("isolated context has no page".into())),
        };
        context.dispose().await;
        settle_lease(&mut lease, result.as_ref().err()).await;
        result
    }
}

impl DocumentRenderer for ChromiumRenderer {
    async fn capture(
        &self,
        url: &str,
        options: &CaptureRenderOptions,
    ) -> Result<CapturedDocument, RenderError> {
        let (mut lease, context) = self.open().await?;
        let result = match context.page() {
            Some(page) => capture_in(page, url, options).await,
            None => Err(RenderError::Engine("isolated context has no page".into())),
        };
        context.dispose().await;
        settle_lease(&mut lease, result.as_ref().err()).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hung_health_check_counts_as_dead() {
        let hung = std::future::pending::<bool>();
        assert!(!responds_within(hung, HEALTH_CHECK_BUDGET).await);
        assert!(responds_within(async { true }, HEALTH_CHECK_BUDGET).await);
        assert!(!responds_within(async { false }, HEALTH_CHECK_BUDGET).await);
    }
}
