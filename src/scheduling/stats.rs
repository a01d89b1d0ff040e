//! Queue counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters, mutated only by the queue
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    /// Admitted work (queued + in flight), compared against the ceiling
    pub depth: AtomicUsize,
    /// Attempts waiting for a concurrency slot or their origin slot
    pub queued: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub blocked: AtomicU64,
    pub rejected: AtomicU64,
    pub retries: AtomicU64,
}

/// Read-only snapshot for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    pub depth: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
    pub blocked: u64,
    pub rejected: u64,
    pub retries: u64,
    pub max_queue_size: usize,
    pub max_concurrent: usize,
}

impl QueueStats {
    pub fn has_headroom(&self) -> bool {
        self.depth < self.max_queue_size
    }
}

impl QueueCounters {
    pub fn snapshot(&self, max_queue_size: usize, max_concurrent: usize) -> QueueStats {
        QueueStats {
            depth: self.depth.load(Ordering::SeqCst),
            queued: self.queued.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            max_queue_size,
            max_concurrent,
        }
    }
}

/// Increments a gauge on creation and decrements it on drop, so the gauge
/// stays correct when a submission future is cancelled mid-await
pub(crate) struct GaugeGuard<'a>(&'a AtomicUsize);

impl<'a> GaugeGuard<'a> {
    pub fn enter(gauge: &'a AtomicUsize) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
