//! Startup validation of `ServiceConfig`

use super::ConfigError;
use super::types::ServiceConfig;

impl ServiceConfig {
    /// Check every cross-field invariant before any resource is created.
    ///
    /// The queue may never admit more concurrent attempts than the pool can
    /// lease browsers, otherwise admitted work stalls inside `acquire`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_browsers == 0 {
            return Err(ConfigError::Invalid("pool.max_browsers must be at least 1".into()));
        }
        if self.pool.launch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pool.launch_timeout_secs must be at least 1".into(),
            ));
        }
        if self.queue.max_concurrent == 0 {
            return Err(ConfigError::Invalid("queue.max_concurrent must be at least 1".into()));
        }
        if self.queue.max_queue_size == 0 {
            return Err(ConfigError::Invalid("queue.max_queue_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.queue.retry_jitter) {
            return Err(ConfigError::Invalid(format!(
                "queue.retry_jitter must be within [0, 1], got {}",
                self.queue.retry_jitter
            )));
        }
        if self.queue.retry_base_delay_ms > self.queue.retry_max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "queue.retry_base_delay_ms ({}) exceeds queue.retry_max_delay_ms ({})",
                self.queue.retry_base_delay_ms, self.queue.retry_max_delay_ms
            )));
        }
        if self.queue.max_concurrent > self.pool.max_browsers {
            return Err(ConfigError::ConcurrencyExceedsPool {
                max_concurrent: self.queue.max_concurrent,
                max_browsers: self.pool.max_browsers,
            });
        }
        if self.fetch.navigation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.navigation_timeout_secs must be at least 1".into(),
            ));
        }
        if self.mapper.max_pages == 0 || self.mapper.page_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "mapper.max_pages and mapper.page_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
