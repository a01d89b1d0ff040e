//! Isolated browsing contexts
//!
//! Each render runs in its own CDP browser context (an incognito-like
//! partition), so cookies, storage and cache never leak between requests
//! that happen to share an engine process.

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::PoolError;

/// A fresh page inside a dedicated browser context
///
/// Call [`IsolatedContext::dispose`] when done. If the value is dropped
/// without disposal, disposal is spawned on the current runtime.
pub struct IsolatedContext {
    browser: Arc<Browser>,
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
}

impl IsolatedContext {
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Close the page and dispose of the browser context
    pub async fn dispose(mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        dispose_parts(Arc::clone(&self.browser), page, context_id).await;
    }
}

impl Drop for IsolatedContext {
    fn drop(&mut self) {
        if self.page.is_none() && self.context_id.is_none() {
            return;
        }
        let page = self.page.take();
        let context_id = self.context_id.take();
        let browser = Arc::clone(&self.browser);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(dispose_parts(browser, page, context_id));
        } else {
            warn!("IsolatedContext dropped outside a runtime; context not disposed");
        }
    }
}

async fn dispose_parts(browser: Arc<Browser>, page: Option<Page>, context_id: Option<BrowserContextId>) {
    if let Some(page) = page
        && let Err(e) = page.close().await
    {
        debug!("Failed to close page: {}", e);
    }
    if let Some(id) = context_id
        && let Err(e) = browser.execute(DisposeBrowserContextParams::new(id)).await
    {
        debug!("Failed to dispose browser context: {}", e);
    }
}

/// Create a cookie/state-isolated context on `browser`, tagged with `identity`
/// as its user agent, and open a blank page in it.
pub async fn create_isolated_context(
    browser: &Arc<Browser>,
    identity: &str,
) -> Result<IsolatedContext, PoolError> {
    let context_id = browser
        .execute(CreateBrowserContextParams::default())
        .await
        .map_err(PoolError::engine)?
        .result
        .browser_context_id;

    let mut isolated = IsolatedContext {
        browser: Arc::clone(browser),
        page: None,
        context_id: Some(context_id.clone()),
    };

    let target = CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id)
        .build()
        .map_err(PoolError::Engine)?;

    let page = browser.new_page(target).await.map_err(PoolError::engine)?;
    page.set_user_agent(SetUserAgentOverrideParams::new(identity)).await.map_err(PoolError::engine)?;
    isolated.page = Some(page);

    Ok(isolated)
}
