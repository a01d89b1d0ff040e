//! Error types for the browser pool

use thiserror::Error;

/// Failures surfaced by [`BrowserPool`](super::BrowserPool)
#[derive(Debug, Error)]
pub enum PoolError {
    /// The engine process could not be started (or did not start in time)
    #[error("browser engine failed to start: {0}")]
    Startup(String),

    /// `shutdown()` has begun; no further leases are handed out
    #[error("browser pool is shutting down")]
    ShuttingDown,

    /// A CDP-level failure on an engine that did start
    #[error("browser engine error: {0}")]
    Engine(String),
}

impl PoolError {
    pub(crate) fn startup(err: impl std::fmt::Display) -> Self {
        Self::Startup(err.to_string())
    }

    pub(crate) fn engine(err: impl std::fmt::Display) -> Self {
        Self::Engine(err.to_string())
    }
}
