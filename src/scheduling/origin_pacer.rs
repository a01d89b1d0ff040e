//! Per-origin request spacing
//!
//! A start is recorded only when it is claimed, and a claim succeeds only
//! once `last + interval` has passed, so two starts on the same origin are
//! never closer than the interval. Waiting for the origin to become ready
//! happens before a concurrency slot is taken; see `SchedulingQueue::submit`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct OriginPacer {
    interval: Duration,
    /// Last claimed start per origin
    last_start: DashMap<String, Instant>,
}

impl OriginPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: DashMap::new(),
        }
    }

    /// Earliest instant `origin` may start again
    pub fn ready_at(&self, origin: &str) -> Instant {
        let now = Instant::now();
        self.last_start
            .get(origin)
            .map_or(now, |last| (*last + self.interval).max(now))
    }

    /// Sleep until `origin` is ready; returns time waited.
    ///
    /// Readiness is not a reservation: another caller may claim the slot first.
    pub async fn wait_ready(&self, origin: &str) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }
        let ready = self.ready_at(origin);
        let wait = ready.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(target: "pagefetch::queue", "Pacing {} for {:?}", origin, wait);
            tokio::time::sleep_until(ready).await;
        }
        wait
    }

    /// Record a start for `origin` now, or return when it becomes ready
    pub fn try_claim(&self, origin: &str) -> Result<(), Instant> {
        let now = Instant::now();
        match self.last_start.entry(origin.to_owned()) {
            Entry::Occupied(mut entry) => {
                let ready = *entry.get() + self.interval;
                if now < ready {
                    return Err(ready);
                }
                entry.insert(now);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(())
            }
        }
    }

    /// Number of origins seen so far
    pub fn tracked_origins(&self) -> usize {
        self.last_start.len()
    }
}
