//! Core configuration types for the fetch service
//!
//! Every sub-config is `serde` (de)serialisable and carries the documented
//! defaults through its `Default` impl.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_CAPTURE_DELAY_MS, DEFAULT_LAUNCH_TIMEOUT_SECS, DEFAULT_MAPPER_PAGE_DELAY_MS,
    DEFAULT_MAX_BROWSERS, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES,
    DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_NAVIGATION_TIMEOUT_SECS,
    DEFAULT_ORIGIN_INTERVAL_MS, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_JITTER, DEFAULT_RETRY_MAX_MS,
};

/// Top-level configuration, constructed once at process start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub pool: PoolConfig,
    pub queue: QueueConfig,
    pub fetch: FetchDefaults,
    pub mapper: MapperConfig,
    pub capture: CaptureConfig,
    pub server: ServerConfig,
}

/// Browser resource pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of engine processes alive at once
    pub max_browsers: usize,
    /// How long a single engine launch may take before it is a startup failure
    pub launch_timeout_secs: u64,
    /// Run browsers in headless mode (default: true)
    pub headless: bool,
    /// Explicit Chrome/Chromium executable; discovered when `None`
    pub chrome_path: Option<PathBuf>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_browsers: DEFAULT_MAX_BROWSERS,
            launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT_SECS,
            headless: true,
            chrome_path: None,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }
}

/// Scheduling queue settings (backpressure, pacing, retries)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Global cap on concurrently executing attempts
    pub max_concurrent: usize,
    /// Queued + in-flight ceiling; submissions at or above it are rejected
    pub max_queue_size: usize,
    /// Minimum spacing between two attempts against the same origin
    pub min_origin_interval_ms: u64,
    /// Additional attempts after the first for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubled per attempt
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling
    pub retry_max_delay_ms: u64,
    /// Random jitter, as a fraction of the computed delay, in `[0, 1]`
    pub retry_jitter: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            min_origin_interval_ms: DEFAULT_ORIGIN_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_MS,
            retry_jitter: DEFAULT_RETRY_JITTER,
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn min_origin_interval(&self) -> Duration {
        Duration::from_millis(self.min_origin_interval_ms)
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    #[must_use]
    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

/// Defaults applied to fetch requests that omit their own values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchDefaults {
    pub navigation_timeout_secs: u64,
    pub settle_delay_ms: u64,
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            settle_delay_ms: 0,
        }
    }
}

impl FetchDefaults {
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Site mapper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub max_pages: usize,
    pub max_depth: u8,
    /// Polite delay between two page renders of the same crawl
    pub page_delay_ms: u64,
    /// Pages rendered concurrently within one depth level
    pub page_concurrency: usize,
    pub navigation_timeout_secs: u64,
    /// Phrases counted as keyword hits on each visited page
    pub keywords: Vec<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            page_delay_ms: DEFAULT_MAPPER_PAGE_DELAY_MS,
            page_concurrency: 1,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            keywords: vec![
                "bell schedule".to_string(),
                "schedule".to_string(),
                "school hours".to_string(),
                "start time".to_string(),
                "dismissal".to_string(),
            ],
        }
    }
}

impl MapperConfig {
    #[must_use]
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Document capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Default output directory when a capture request omits one
    pub output_dir: PathBuf,
    /// Delay inserted between two captures
    pub capture_delay_ms: u64,
    pub navigation_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir().join("kodegen_pagefetch_captures"),
            capture_delay_ms: DEFAULT_CAPTURE_DELAY_MS,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Boundary service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Shared secret required in the `x-api-key` header when set
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_key: None,
        }
    }
}
