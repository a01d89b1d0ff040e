//! Shared fakes for the integration suites

use kodegen_tools_pagefetch::browser_pool::{BrowserPool, Engine, EngineLauncher, PoolError};
use kodegen_tools_pagefetch::config::ServiceConfig;
use kodegen_tools_pagefetch::renderer::{
    CaptureRenderOptions, CapturedDocument, DocumentRenderer, PageRenderer, RenderError,
    RenderOptions, RenderedPage,
};
use kodegen_tools_pagefetch::service::ServiceContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};

pub struct FakeEngine;

impl Engine for FakeEngine {
    async fn is_alive(&self) -> bool {
        true
    }

    async fn close(self) {}
}

pub struct FakeLauncher;

impl EngineLauncher for FakeLauncher {
    type Engine = FakeEngine;

    async fn launch(&self, _id: u64) -> Result<FakeEngine, PoolError> {
        Ok(FakeEngine)
    }
}

/// Serves canned HTML per URL and counts navigations; clones share the counters
#[derive(Clone, Default)]
pub struct ScriptedSite {
    pages: HashMap<String, (u16, String)>,
    navigations: Arc<Mutex<HashMap<String, u32>>>,
    total: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, html: &str) -> Self {
        self.pages.insert(url.to_string(), (status, html.to_string()));
        self
    }

    pub fn navigations_to(&self, url: &str) -> u32 {
        self.navigations
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_navigations(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }

    fn visit(&self, url: &str) -> Option<(u16, String)> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .navigations
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;
        self.pages.get(url).cloned()
    }
}

impl PageRenderer for ScriptedSite {
    async fn render(&self, url: &str, _options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let (status, html) = self
            .visit(url)
            .ok_or_else(|| RenderError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        Ok(RenderedPage {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            status: Some(status),
            html,
            title: None,
            document: None,
        })
    }
}

impl DocumentRenderer for ScriptedSite {
    async fn capture(
        &self,
        url: &str,
        _options: &CaptureRenderOptions,
    ) -> Result<CapturedDocument, RenderError> {
        let (_, html) = self
            .visit(url)
            .ok_or_else(|| RenderError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        Ok(CapturedDocument {
            bytes: format!("%PDF-1.7\n{html}").into_bytes(),
            title: None,
            overlay_dismissed: html.contains("cookie"),
        })
    }
}

/// Defaults with pacing and retry delays shortened
#[allow(dead_code)]
pub fn quick_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.queue.min_origin_interval_ms = 0;
    config.queue.retry_base_delay_ms = 10;
    config.queue.retry_max_delay_ms = 50;
    config.mapper.page_delay_ms = 0;
    config.capture.capture_delay_ms = 0;
    config
}

#[allow(dead_code)]
pub fn service(site: ScriptedSite) -> ServiceContext<ScriptedSite, FakeLauncher> {
    service_with(quick_config(), site)
}

#[allow(dead_code)]
pub fn service_with(
    config: ServiceConfig,
    site: ScriptedSite,
) -> ServiceContext<ScriptedSite, FakeLauncher> {
    let pool = BrowserPool::with_launcher(config.pool.clone(), FakeLauncher);
    ServiceContext::with_parts(config, pool, site).expect("valid test config")
}
