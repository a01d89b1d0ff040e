//! Bounded browser-engine pool
//!
//! Hands out at most `max_browsers` leases at a time. Engines are launched on
//! demand up to that bound and kept idle between leases. When every engine is
//! leased, `acquire` waits on a fair semaphore, so waiters are served in FIFO
//! order. Idle engines are health-checked before reuse; engines that crashed
//! are evicted rather than returned to the idle set.

pub mod context;
pub mod engine;
pub mod error;

pub use context::{IsolatedContext, create_isolated_context};
pub use engine::{ChromiumEngine, ChromiumLauncher, Engine, EngineLauncher};
pub use error::PoolError;

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;

// =============================================================================
// Pooled engine handle
// =============================================================================

/// An engine with pool metadata
#[derive(Debug)]
pub struct PooledBrowser<E> {
    /// Unique identifier for this engine instance
    pub id: u64,
    /// When this engine was launched
    pub created_at: Instant,
    /// Last time this engine was acquired or returned
    pub last_used: Instant,
    engine: E,
}

impl<E> PooledBrowser<E> {
    fn new(id: u64, engine: E) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_used: now,
            engine,
        }
    }
}

/// Point-in-time view of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max: usize,
    pub leased: usize,
    pub idle: usize,
    pub launched_total: u64,
    pub evicted_total: u64,
    pub shutting_down: bool,
}

// =============================================================================
// Browser Pool
// =============================================================================

/// Bounded pool of browser engines
pub struct BrowserPool<L: EngineLauncher = ChromiumLauncher> {
    config: PoolConfig,
    launcher: L,
    /// One permit per lease; tokio's semaphore queues waiters FIFO
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<PooledBrowser<L::Engine>>>,
    leased: AtomicUsize,
    next_id: AtomicU64,
    launched_total: AtomicU64,
    evicted_total: AtomicU64,
    shutting_down: AtomicBool,
}

impl BrowserPool<ChromiumLauncher> {
    /// Pool backed by real Chromium processes
    pub fn chromium(config: PoolConfig) -> Arc<Self> {
        let launcher = ChromiumLauncher::new(&config);
        Self::with_launcher(config, launcher)
    }
}

impl<L: EngineLauncher> BrowserPool<L> {
    /// Create a pool with a custom launcher. No engine is started until the
    /// first `acquire`.
    pub fn with_launcher(config: PoolConfig, launcher: L) -> Arc<Self> {
        info!(
            "Creating browser pool (max_browsers={}, launch_timeout={:?})",
            config.max_browsers,
            config.launch_timeout()
        );
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(config.max_browsers)),
            config,
            launcher,
            idle: Mutex::new(VecDeque::new()),
            leased: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            launched_total: AtomicU64::new(0),
            evicted_total: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Acquire a ready engine.
    ///
    /// Reuses a healthy idle engine, otherwise launches one (bounded by the
    /// configured launch timeout). Waits in FIFO order when all engines are
    /// leased. The returned guard releases the lease exactly once on drop.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledBrowserGuard<L>, PoolError> {
        if self.is_shutting_down() {
            return Err(PoolError::ShuttingDown);
        }

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShuttingDown)?;

        let browser = self.take_or_launch().await?;

        if self.is_shutting_down() {
            close_detached(browser.engine);
            return Err(PoolError::ShuttingDown);
        }

        self.leased.fetch_add(1, Ordering::SeqCst);
        debug!("Acquired browser {} from pool", browser.id);

        Ok(PooledBrowserGuard {
            browser: Some(browser),
            permit: Some(permit),
            crashed: false,
            pool: Arc::clone(self),
        })
    }

    async fn take_or_launch(&self) -> Result<PooledBrowser<L::Engine>, PoolError> {
        loop {
            let candidate = self.lock_idle().pop_front();
            let Some(mut browser) = candidate else {
                break;
            };

            if browser.engine.is_alive().await {
                browser.last_used = Instant::now();
                return Ok(browser);
            }

            warn!("Evicting browser {} after failed health check", browser.id);
            self.evicted_total.fetch_add(1, Ordering::Relaxed);
            close_detached(browser.engine);
        }

        self.launch_new().await
    }

    async fn launch_new(&self) -> Result<PooledBrowser<L::Engine>, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.launch_timeout();

        let engine = match tokio::time::timeout(timeout, self.launcher.launch(id)).await {
            Ok(Ok(engine)) => engine,
            Ok(Err(e)) => {
                warn!("Failed to launch browser {}: {}", id, e);
                return Err(e);
            }
            Err(_) => {
                warn!("Browser {} did not start within {:?}", id, timeout);
                return Err(PoolError::Startup(format!(
                    "engine launch timed out after {timeout:?}"
                )));
            }
        };

        self.launched_total.fetch_add(1, Ordering::Relaxed);
        debug!("Launched new browser {} for acquire (no idle engine)", id);
        Ok(PooledBrowser::new(id, engine))
    }

    /// Return a lease. Crashed engines and engines released during shutdown
    /// are closed instead of being put back.
    fn release(&self, mut browser: PooledBrowser<L::Engine>, crashed: bool) {
        self.leased.fetch_sub(1, Ordering::SeqCst);

        if crashed {
            warn!("Evicting crashed browser {}", browser.id);
            self.evicted_total.fetch_add(1, Ordering::Relaxed);
            close_detached(browser.engine);
            return;
        }
        // Flag is read under the idle lock so a concurrent shutdown drain
        // either sees this engine or this release sees the flag.
        let mut idle = self.lock_idle();
        if self.is_shutting_down() {
            drop(idle);
            close_detached(browser.engine);
            return;
        }

        browser.last_used = Instant::now();
        let id = browser.id;
        idle.push_back(browser);
        drop(idle);
        debug!("Released browser {} back to pool", id);
    }

    /// Close every engine. Waiters and later `acquire` calls fail with
    /// [`PoolError::ShuttingDown`]; outstanding leases are closed on release.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Browser pool shutdown already in progress");
            return;
        }
        info!("Shutting down browser pool");
        self.permits.close();

        let drained: Vec<_> = self.lock_idle().drain(..).collect();
        for browser in drained {
            debug!("Closing browser {}", browser.id);
            browser.engine.close().await;
        }

        info!("Browser pool shutdown complete");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn max_browsers(&self) -> usize {
        self.config.max_browsers
    }

    /// Leases that could be handed out right now without waiting
    pub fn available_leases(&self) -> usize {
        if self.is_shutting_down() {
            0
        } else {
            self.permits.available_permits()
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max: self.config.max_browsers,
            leased: self.leased.load(Ordering::SeqCst),
            idle: self.lock_idle().len(),
            launched_total: self.launched_total.load(Ordering::Relaxed),
            evicted_total: self.evicted_total.load(Ordering::Relaxed),
            shutting_down: self.is_shutting_down(),
        }
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, VecDeque<PooledBrowser<L::Engine>>> {
        // A poisoned deque still holds valid engines
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Close an engine without blocking the caller
fn close_detached<E: Engine>(engine: E) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(engine.close());
        }
        Err(_) => warn!("No runtime available to close engine; dropping it"),
    }
}

// =============================================================================
// RAII Guard
// =============================================================================

/// RAII lease on a pooled engine; releases on drop
pub struct PooledBrowserGuard<L: EngineLauncher = ChromiumLauncher> {
    browser: Option<PooledBrowser<L::Engine>>,
    permit: Option<OwnedSemaphorePermit>,
    crashed: bool,
    pool: Arc<BrowserPool<L>>,
}

impl<L: EngineLauncher> PooledBrowserGuard<L> {
    /// The leased engine
    pub fn engine(&self) -> Option<&L::Engine> {
        self.browser.as_ref().map(|b| &b.engine)
    }

    /// The engine's unique pool id
    pub fn id(&self) -> Option<u64> {
        self.browser.as_ref().map(|b| b.id)
    }

    /// Flag the engine as unusable so release evicts it
    pub fn mark_crashed(&mut self) {
        self.crashed = true;
    }
}

impl<L: EngineLauncher> Drop for PooledBrowserGuard<L> {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            self.pool.release(browser, self.crashed);
        }
        // Permit goes back only after the engine is idle again, so the next
        // waiter finds it instead of launching a new one.
        drop(self.permit.take());
    }
}
