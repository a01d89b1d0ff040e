//! Environment overlay for `ServiceConfig`
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PAGEFETCH_POOL_MAX_BROWSERS` | `pool.max_browsers` |
//! | `PAGEFETCH_POOL_LAUNCH_TIMEOUT_SECS` | `pool.launch_timeout_secs` |
//! | `PAGEFETCH_HEADLESS` | `pool.headless` |
//! | `CHROMIUM_PATH` | `pool.chrome_path` |
//! | `PAGEFETCH_QUEUE_MAX_CONCURRENT` | `queue.max_concurrent` |
//! | `PAGEFETCH_QUEUE_MAX_SIZE` | `queue.max_queue_size` |
//! | `PAGEFETCH_ORIGIN_INTERVAL_MS` | `queue.min_origin_interval_ms` |
//! | `PAGEFETCH_MAX_RETRIES` | `queue.max_retries` |
//! | `PAGEFETCH_RETRY_BASE_MS` | `queue.retry_base_delay_ms` |
//! | `PAGEFETCH_RETRY_MAX_MS` | `queue.retry_max_delay_ms` |
//! | `PAGEFETCH_RETRY_JITTER` | `queue.retry_jitter` |
//! | `PAGEFETCH_NAVIGATION_TIMEOUT_SECS` | `fetch.navigation_timeout_secs` |
//! | `PAGEFETCH_CAPTURE_DIR` | `capture.output_dir` |
//! | `PAGEFETCH_BIND` | `server.bind` |
//! | `PAGEFETCH_API_KEY` | `server.api_key` |

use std::path::PathBuf;
use std::str::FromStr;

use super::ConfigError;
use super::types::ServiceConfig;

/// Read and parse one variable; absent or empty variables yield `None`
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

impl ServiceConfig {
    /// Defaults overlaid with `PAGEFETCH_*` process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary lookup (used by `from_env` and tests)
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_POOL_MAX_BROWSERS")? {
            self.pool.max_browsers = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_POOL_LAUNCH_TIMEOUT_SECS")? {
            self.pool.launch_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_HEADLESS")? {
            self.pool.headless = v;
        }
        if let Some(v) = parse_var::<PathBuf>(&lookup, "CHROMIUM_PATH")? {
            self.pool.chrome_path = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_QUEUE_MAX_CONCURRENT")? {
            self.queue.max_concurrent = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_QUEUE_MAX_SIZE")? {
            self.queue.max_queue_size = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_ORIGIN_INTERVAL_MS")? {
            self.queue.min_origin_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_MAX_RETRIES")? {
            self.queue.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_RETRY_BASE_MS")? {
            self.queue.retry_base_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_RETRY_MAX_MS")? {
            self.queue.retry_max_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_RETRY_JITTER")? {
            self.queue.retry_jitter = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_NAVIGATION_TIMEOUT_SECS")? {
            self.fetch.navigation_timeout_secs = v;
        }
        if let Some(v) = parse_var::<PathBuf>(&lookup, "PAGEFETCH_CAPTURE_DIR")? {
            self.capture.output_dir = v;
        }
        if let Some(v) = parse_var(&lookup, "PAGEFETCH_BIND")? {
            self.server.bind = v;
        }
        if let Some(v) = lookup("PAGEFETCH_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.server.api_key = Some(v);
        }
        Ok(self)
    }
}
