//! Configuration module for the fetch service
//!
//! `ServiceConfig` groups the pool, queue, fetch, mapper, capture and server
//! settings. Defaults live in the `Default` impls; `from_env` overlays
//! `PAGEFETCH_*` variables and `validate` enforces cross-field invariants.

pub mod env;
pub mod types;
pub mod validation;

pub use types::{
    CaptureConfig, FetchDefaults, MapperConfig, PoolConfig, QueueConfig, ServerConfig,
    ServiceConfig,
};

/// Configuration errors surfaced at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidEnv {
        name: String,
        value: String,
        reason: String,
    },

    /// Queue concurrency wider than the browser pool
    #[error(
        "queue.max_concurrent ({max_concurrent}) exceeds pool.max_browsers ({max_browsers}); \
         admitted work would stall waiting for a browser"
    )]
    ConcurrencyExceedsPool {
        max_concurrent: usize,
        max_browsers: usize,
    },

    /// Any other out-of-range value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
