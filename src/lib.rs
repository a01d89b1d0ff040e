pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod discovery;
pub mod document_capture;
pub mod fetch_executor;
pub mod renderer;
pub mod scheduling;
pub mod server;
pub mod service;
pub mod site_mapper;
pub mod utils;

pub use browser_pool::{BrowserPool, PoolError, PoolStats, PooledBrowserGuard};
pub use browser_setup::{LaunchSpec, download_managed_browser, find_browser_executable, launch_browser};
pub use config::{ConfigError, ServiceConfig};
pub use discovery::{DiscoverRequest, DiscoveryMethod, DiscoveryResult, SubsiteDiscovery};
pub use document_capture::{CaptureRecord, CaptureRequest, CaptureResult, DocumentCapturer};
pub use fetch_executor::{
    ChallengeSignal, ErrorKind, FetchExecutor, FetchOutcome, FetchRequest, SecurityBlockSignal,
};
pub use renderer::{
    ChromiumRenderer, DocumentOptions, DocumentRenderer, PageRenderer, RenderError, RenderOptions,
    RenderedPage,
};
pub use scheduling::{QueueError, QueueStats, SchedulingQueue};
pub use service::{HealthReport, ServiceContext, ServiceError, StatusReport};
pub use site_mapper::{CrawlPageRecord, MapRequest, MapResult, SiteMapper};
