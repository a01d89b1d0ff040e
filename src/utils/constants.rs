//! Shared configuration constants for pagefetch
//!
//! Default values used throughout the codebase to keep behaviour consistent
//! and avoid magic numbers.

/// Fixed client identity presented by every isolated browsing context.
///
/// The service identifies itself honestly; it never rotates or spoofs
/// identities to get past access controls.
pub const CLIENT_IDENTITY: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36 kodegen-pagefetch/0.1 (+https://kodegen.ai/bot)";

/// Default maximum number of browser engine processes in the pool
pub const DEFAULT_MAX_BROWSERS: usize = 3;

/// Default browser launch timeout (seconds)
pub const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrently executing fetch attempts
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default queued + in-flight ceiling before requests are rejected
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Default minimum spacing between two requests to the same origin (ms)
pub const DEFAULT_ORIGIN_INTERVAL_MS: u64 = 2_000;

/// Default additional attempts for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default first backoff delay (ms)
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;

/// Default backoff ceiling (ms)
pub const DEFAULT_RETRY_MAX_MS: u64 = 30_000;

/// Default jitter fraction added on top of each backoff delay
pub const DEFAULT_RETRY_JITTER: f64 = 0.25;

/// Default navigation timeout (seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default maximum pages per site map
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Default maximum crawl depth for site maps
pub const DEFAULT_MAX_DEPTH: u8 = 2;

/// Default polite delay between two site map page renders (ms)
pub const DEFAULT_MAPPER_PAGE_DELAY_MS: u64 = 500;

/// Default delay between two document captures (ms)
pub const DEFAULT_CAPTURE_DELAY_MS: u64 = 1_000;

/// Quiet window used to decide that a page's network activity has settled (ms)
pub const NETWORK_IDLE_WINDOW_MS: u64 = 500;

/// Maximum number of sites returned in representative discovery mode
pub const REPRESENTATIVE_SAMPLE_SIZE: usize = 5;

/// Header carrying the shared secret on boundary requests
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the correlation identifier on boundary responses
pub const REQUEST_ID_HEADER: &str = "x-request-id";
