//! Bounded scheduling queue with retries
//!
//! Per logical request:
//! `Queued -> (rejected if full) | Admitted -> Executing ->
//!  {Success | Retryable failure -> backoff -> Executing | Terminal failure} -> Done`
//!
//! The queue is generic over the unit of work. Retry eligibility comes only
//! from the [`ErrorKind`] each attempt reports.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use super::origin_pacer::OriginPacer;
use super::stats::{GaugeGuard, QueueCounters, QueueStats};
use crate::config::QueueConfig;
use crate::fetch_executor::{ErrorKind, FetchOutcome};
use crate::utils::origin_of;

/// A completed attempt that may still describe a failure
pub trait Attempt {
    /// `None` on success, otherwise the classification of the failure
    fn failure_kind(&self) -> Option<ErrorKind>;

    /// Called once with the number of attempts the logical request took
    fn record_attempts(&mut self, _attempts: u32) {}
}

impl Attempt for FetchOutcome {
    fn failure_kind(&self) -> Option<ErrorKind> {
        if self.success { None } else { self.error_kind }
    }

    fn record_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }
}

/// An attempt that failed without producing a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Admission refused; nothing was executed
    #[error("queue full ({depth}/{capacity})")]
    QueueFull { depth: usize, capacity: usize },

    /// Every attempt failed without producing a value
    #[error("{kind} after {attempts} attempt(s): {message}")]
    Exhausted {
        kind: ErrorKind,
        message: String,
        attempts: u32,
    },

    #[error("queue is shutting down")]
    ShuttingDown,
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QueueFull { .. } => ErrorKind::QueueFull,
            Self::Exhausted { kind, .. } => *kind,
            Self::ShuttingDown => ErrorKind::NetworkError,
        }
    }
}

/// Decrements admitted depth exactly once, on whatever path `submit` exits
struct Admission<'a> {
    counters: &'a QueueCounters,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.counters.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

enum LastFailure<T> {
    Value(T),
    Failure(TaskFailure),
}

/// Concurrency-capped, origin-paced queue with retry and backpressure
#[derive(Debug)]
pub struct SchedulingQueue {
    config: QueueConfig,
    permits: Arc<Semaphore>,
    pacer: OriginPacer,
    backoff: BackoffPolicy,
    counters: QueueCounters,
}

impl SchedulingQueue {
    pub fn new(config: QueueConfig) -> Self {
        info!(
            target: "pagefetch::queue",
            "Creating scheduling queue (max_concurrent={}, max_queue_size={}, origin_interval={:?}, max_retries={})",
            config.max_concurrent,
            config.max_queue_size,
            config.min_origin_interval(),
            config.max_retries
        );
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            pacer: OriginPacer::new(config.min_origin_interval()),
            backoff: BackoffPolicy::from_config(&config),
            counters: QueueCounters::default(),
            config,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn stats(&self) -> QueueStats {
        self.counters
            .snapshot(self.config.max_queue_size, self.config.max_concurrent)
    }

    /// Stop admitting work; attempts waiting for a slot fail with `ShuttingDown`
    pub fn close(&self) {
        self.permits.close();
    }

    fn admit(&self) -> Result<Admission<'_>, QueueError> {
        let capacity = self.config.max_queue_size;
        match self
            .counters
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                (depth < capacity).then_some(depth + 1)
            }) {
            Ok(_) => Ok(Admission {
                counters: &self.counters,
            }),
            Err(depth) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(target: "pagefetch::queue", "Rejecting work: queue full ({}/{})", depth, capacity);
                Err(QueueError::QueueFull { depth, capacity })
            }
        }
    }

    fn record_terminal(&self, kind: ErrorKind) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        if kind == ErrorKind::Blocked {
            self.counters.blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a concurrency slot for an attempt on `origin`.
    ///
    /// Pacing waits happen without a slot held, so a burst to one origin
    /// cannot starve the others. The start is claimed only once the slot is
    /// in hand; losing the claim to a sibling gives the slot back.
    async fn start_slot(&self, origin: &str) -> Result<SemaphorePermit<'_>, QueueError> {
        loop {
            self.pacer.wait_ready(origin).await;
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| QueueError::ShuttingDown)?;
            match self.pacer.try_claim(origin) {
                Ok(()) => return Ok(permit),
                Err(ready) => {
                    drop(permit);
                    debug!(target: "pagefetch::queue", "Lost pacing slot for {}; next at {:?}", origin, ready);
                }
            }
        }
    }

    /// Run `task` for the request at `url` and return its single final result.
    ///
    /// `task` is called with the 1-based attempt number. Each attempt holds a
    /// concurrency slot while it runs and starts no earlier than the origin's
    /// pacing interval allows; no slot is held while pacing or backing off.
    pub async fn submit<T, F, Fut>(&self, url: &str, mut task: F) -> Result<T, QueueError>
    where
        T: Attempt,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TaskFailure>>,
    {
        let _admission = self.admit()?;
        let origin = origin_of(url).unwrap_or_else(|| url.to_string());
        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut last: Option<LastFailure<T>> = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            let result = {
                let waiting = GaugeGuard::enter(&self.counters.queued);
                let _permit = self.start_slot(&origin).await?;
                drop(waiting);

                let _running = GaugeGuard::enter(&self.counters.in_flight);
                task(attempt).await
            };

            let kind = match result {
                Ok(mut value) => match value.failure_kind() {
                    None => {
                        self.counters.completed.fetch_add(1, Ordering::Relaxed);
                        value.record_attempts(attempt);
                        return Ok(value);
                    }
                    Some(kind) if !kind.is_retryable() => {
                        debug!(target: "pagefetch::queue", "Terminal {} for {} on attempt {}", kind, url, attempt);
                        self.record_terminal(kind);
                        value.record_attempts(attempt);
                        return Ok(value);
                    }
                    Some(kind) => {
                        last = Some(LastFailure::Value(value));
                        kind
                    }
                },
                Err(failure) if !failure.kind.is_retryable() => {
                    self.record_terminal(failure.kind);
                    return Err(QueueError::Exhausted {
                        kind: failure.kind,
                        message: failure.message,
                        attempts: attempt,
                    });
                }
                Err(failure) => {
                    let kind = failure.kind;
                    last = Some(LastFailure::Failure(failure));
                    kind
                }
            };

            if attempt < max_attempts {
                let delay = self.backoff.delay_for(attempt, &mut rand::rng());
                self.counters.retries.fetch_add(1, Ordering::Relaxed);
                info!(
                    target: "pagefetch::queue",
                    "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                    attempt, max_attempts, url, kind, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!(target: "pagefetch::queue", "Retries exhausted for {} after {} attempts", url, attempts);
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        match last {
            Some(LastFailure::Value(mut value)) => {
                value.record_attempts(attempts);
                Ok(value)
            }
            Some(LastFailure::Failure(failure)) => Err(QueueError::Exhausted {
                kind: failure.kind,
                message: failure.message,
                attempts,
            }),
            None => Err(QueueError::Exhausted {
                kind: ErrorKind::NetworkError,
                message: "no attempt was made".to_string(),
                attempts,
            }),
        }
    }
}
