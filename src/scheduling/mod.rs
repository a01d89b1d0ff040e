//! Concurrency, backpressure, pacing and retry for fetch work

pub mod backoff;
pub mod origin_pacer;
pub mod queue;
pub mod stats;

pub use backoff::BackoffPolicy;
pub use origin_pacer::OriginPacer;
pub use queue::{Attempt, QueueError, SchedulingQueue, TaskFailure};
pub use stats::QueueStats;
