//! Explicit service context
//!
//! Built once at process start and shared by reference. Owns the browser
//! pool, the scheduling queue and every component that renders pages, and
//! makes shutdown an explicit step.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::browser_pool::{BrowserPool, ChromiumLauncher, EngineLauncher, PoolStats};
use crate::config::{ConfigError, ServiceConfig};
use crate::discovery::{DiscoverRequest, DiscoveryError, DiscoveryResult, SubsiteDiscovery};
use crate::document_capture::{CaptureError, CaptureRequest, CaptureResult, DocumentCapturer};
use crate::fetch_executor::{ErrorKind, FetchExecutor, FetchOutcome, FetchRequest};
use crate::renderer::{ChromiumRenderer, DocumentRenderer, PageRenderer};
use crate::scheduling::{QueueError, QueueStats, SchedulingQueue, TaskFailure};
use crate::site_mapper::{MapError, MapRequest, MapResult, SiteMapper};
use crate::utils::is_valid_url;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("invalid url: '{0}' is not an absolute http(s) URL")]
    InvalidUrl(String),
}

/// Liveness as seen by load balancers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    /// A browser lease can be handed out without waiting
    pub pool_available: bool,
    /// The queue can admit more work
    pub queue_headroom: bool,
    pub shutting_down: bool,
}

/// Counters and occupancy for operators
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub queue_depth: usize,
    pub pool_active: usize,
    pub pool_max: usize,
    pub processed: u64,
    pub failed: u64,
    pub blocked: u64,
    pub queue: QueueStats,
    pub pool: PoolStats,
}

/// Everything a running service needs, with an explicit lifecycle
pub struct ServiceContext<R = ChromiumRenderer, L: EngineLauncher = ChromiumLauncher> {
    config: ServiceConfig,
    pool: Arc<BrowserPool<L>>,
    queue: SchedulingQueue,
    executor: FetchExecutor<Arc<R>>,
    mapper: SiteMapper<Arc<R>>,
    capturer: DocumentCapturer<Arc<R>>,
    discovery: SubsiteDiscovery<Arc<R>>,
    started_at: DateTime<Utc>,
    started: Instant,
    shut_down: AtomicBool,
}

impl ServiceContext {
    /// Validate `config` and build a Chromium-backed service. No browser is
    /// launched until the first request needs one.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let pool = BrowserPool::chromium(config.pool.clone());
        let renderer = ChromiumRenderer::new(Arc::clone(&pool));
        Self::with_parts(config, pool, renderer)
    }
}

impl<R, L> ServiceContext<R, L>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    /// Assemble a service around an existing pool and a renderer drawing from it
    pub fn with_parts(
        config: ServiceConfig,
        pool: Arc<BrowserPool<L>>,
        renderer: R,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let renderer = Arc::new(renderer);
        let discovery =
            SubsiteDiscovery::new(Arc::clone(&renderer), config.fetch.navigation_timeout())?;

        info!(
            "Service context ready (pool max {}, queue max {} / concurrency {})",
            config.pool.max_browsers, config.queue.max_queue_size, config.queue.max_concurrent
        );
        Ok(Self {
            queue: SchedulingQueue::new(config.queue.clone()),
            executor: FetchExecutor::new(Arc::clone(&renderer)),
            mapper: SiteMapper::new(Arc::clone(&renderer), config.mapper.clone()),
            capturer: DocumentCapturer::new(renderer, config.capture.clone()),
            discovery,
            pool,
            config,
            started_at: Utc::now(),
            started: Instant::now(),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<BrowserPool<L>> {
        &self.pool
    }

    pub fn queue(&self) -> &SchedulingQueue {
        &self.queue
    }

    /// Request for `url` carrying the configured fetch defaults
    pub fn fetch_request(&self, url: impl Into<String>) -> FetchRequest {
        FetchRequest::new(url, &self.config.fetch)
    }

    /// Fetch one page through the queue; the outcome is final after any retries
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, ServiceError> {
        if !is_valid_url(request.url.trim()) {
            return Err(ServiceError::InvalidUrl(request.url));
        }
        let started = Instant::now();
        let executor = &self.executor;
        let attempt_request = &request;

        let result = self
            .queue
            .submit(&request.url, move |_attempt| async move {
                Ok::<_, TaskFailure>(executor.execute(attempt_request).await)
            })
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(QueueError::Exhausted {
                kind,
                message,
                attempts,
            }) => {
                let mut outcome = FetchOutcome::failure(&request.url, kind, message);
                outcome.attempts = attempts;
                outcome
            }
            Err(e @ QueueError::QueueFull { .. }) => {
                FetchOutcome::failure(&request.url, ErrorKind::QueueFull, e.to_string())
            }
            Err(e @ QueueError::ShuttingDown) => {
                FetchOutcome::failure(&request.url, e.kind(), e.to_string())
            }
        };
        Ok(outcome.with_elapsed(started.elapsed()))
    }

    pub async fn map(&self, request: &MapRequest) -> Result<MapResult, MapError> {
        self.mapper.map(request).await
    }

    pub async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResult, CaptureError> {
        self.capturer.capture(request).await
    }

    pub async fn discover(&self, request: &DiscoverRequest) -> Result<DiscoveryResult, DiscoveryError> {
        self.discovery.discover(request).await
    }

    pub fn health(&self) -> HealthReport {
        let shutting_down = self.is_shut_down() || self.pool.is_shutting_down();
        let pool_available = self.pool.available_leases() > 0;
        let queue_headroom = self.queue.stats().has_headroom();
        HealthReport {
            healthy: !shutting_down && pool_available && queue_headroom,
            pool_available,
            queue_headroom,
            shutting_down,
        }
    }

    pub fn status(&self) -> StatusReport {
        let queue = self.queue.stats();
        let pool = self.pool.stats();
        StatusReport {
            version: env!("CARGO_PKG_VERSION"),
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            queue_depth: queue.depth,
            pool_active: pool.leased,
            pool_max: pool.max,
            processed: queue.completed,
            failed: queue.failed,
            blocked: queue.blocked,
            queue,
            pool,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop admitting work and close every browser; later calls do nothing
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down service");
        let stats = self.queue.stats();
        if stats.depth > 0 {
            warn!("{} request(s) still admitted at shutdown", stats.depth);
        }
        self.queue.close();
        self.pool.shutdown().await;
    }
}
