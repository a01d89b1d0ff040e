//! Engine abstraction and the Chromium implementation
//!
//! The pool only needs to launch, health-check and close engines, so those
//! three operations are the whole seam. `ChromiumLauncher` is the production
//! implementation; tests drive the pool with lightweight fakes.

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::CloseParams;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::PoolError;
use crate::browser_profile::BrowserProfile;
use crate::browser_setup::{LaunchSpec, launch_browser};
use crate::config::PoolConfig;

/// A running browser-engine process owned by the pool
pub trait Engine: Send + Sync + 'static {
    /// Cheap liveness check, used before an idle engine is handed out
    fn is_alive(&self) -> impl Future<Output = bool> + Send;

    /// Terminate the engine process and release its resources
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Starts engine processes on behalf of the pool
pub trait EngineLauncher: Send + Sync + 'static {
    type Engine: Engine;

    /// Launch engine number `id`
    fn launch(&self, id: u64) -> impl Future<Output = Result<Self::Engine, PoolError>> + Send;
}

/// Launches headless Chrome/Chromium through `browser_setup`
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    chrome_path: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
        }
    }
}

impl EngineLauncher for ChromiumLauncher {
    type Engine = ChromiumEngine;

    async fn launch(&self, id: u64) -> Result<ChromiumEngine, PoolError> {
        // Dropping the profile on the error path deletes the directory
        let profile = BrowserProfile::create().map_err(PoolError::startup)?;
        let spec = LaunchSpec {
            headless: self.headless,
            profile_dir: profile.dir(),
            chrome_path: self.chrome_path.as_deref(),
        };
        let (browser, handler) = launch_browser(&spec)
            .await
            .map_err(|e| PoolError::Startup(format!("{e:#}")))?;

        info!("Launched browser engine {}", id);
        Ok(ChromiumEngine {
            browser: Arc::new(browser),
            handler,
            profile,
        })
    }
}

/// One Chromium process plus its CDP handler task and profile directory
#[derive(Debug)]
pub struct ChromiumEngine {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    profile: BrowserProfile,
}

impl ChromiumEngine {
    /// Shared handle to the underlying browser
    pub fn browser(&self) -> &Arc<Browser> {
        &self.browser
    }
}

impl Engine for ChromiumEngine {
    async fn is_alive(&self) -> bool {
        if self.handler.is_finished() {
            return false;
        }
        match self.browser.version().await {
            Ok(version) => {
                debug!("Browser health check OK: {}", version.product);
                true
            }
            Err(e) => {
                warn!("Browser failed health check: {}", e);
                false
            }
        }
    }

    async fn close(self) {
        if let Err(e) = self.browser.execute(CloseParams::default()).await {
            debug!("Browser close command failed (process may already be gone): {}", e);
        }
        self.handler.abort();
        debug!("Closed browser engine using {}", self.profile.dir().display());
        drop(self.profile);
    }
}
