//! Browser-engine primitives shared by the fetch executor, site mapper and
//! document capturer.
//!
//! Callers depend on the [`PageRenderer`] and [`DocumentRenderer`] traits;
//! [`ChromiumRenderer`] implements both on top of the browser pool.

pub mod chromium;
pub mod overlay;
pub mod page_timeout;
pub mod page_wait;
pub mod pdf;

pub use chromium::ChromiumRenderer;
pub use pdf::{DocumentOptions, Margins, PageFormat};

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::browser_pool::PoolError;

/// Failures while rendering a page
#[derive(Debug, Error)]
pub enum RenderError {
    /// The operation did not finish within its budget
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Navigation itself failed (DNS, connection refused, TLS, aborted...)
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// CDP failure on the page or engine after navigation
    #[error("engine error: {0}")]
    Engine(String),

    /// No engine could be leased
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl RenderError {
    pub(crate) fn engine(err: impl std::fmt::Display) -> Self {
        Self::Engine(err.to_string())
    }

    /// Whether the engine that produced this error may be hung or dead
    pub fn implicates_engine(&self) -> bool {
        matches!(
            self,
            Self::Engine(_) | Self::Timeout { .. } | Self::Pool(PoolError::Engine(_))
        )
    }
}

/// Per-render knobs
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Budget for navigation plus network-idle wait
    pub timeout: Duration,
    /// Extra wait after network idle for late client-side rendering
    pub settle_delay: Duration,
    /// Also export the rendered page as a paginated document
    pub export: Option<DocumentOptions>,
}

/// A rendered page as seen after network idle
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub requested_url: String,
    /// URL after redirects
    pub final_url: String,
    /// Main-document response status, when the engine reports one
    pub status: Option<u16>,
    pub html: String,
    pub title: Option<String>,
    pub document: Option<Vec<u8>>,
}

/// Options for overlay-dismissing document capture
#[derive(Debug, Clone, Default)]
pub struct CaptureRenderOptions {
    pub timeout: Duration,
    pub document: DocumentOptions,
}

/// Exported document plus what happened while preparing it
#[derive(Debug, Clone, Default)]
pub struct CapturedDocument {
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub overlay_dismissed: bool,
}

/// Navigate to a URL and return the rendered document
pub trait PageRenderer: Send + Sync + 'static {
    fn render(
        &self,
        url: &str,
        options: &RenderOptions,
    ) -> impl Future<Output = Result<RenderedPage, RenderError>> + Send;
}

/// Navigate, clear blocking overlays and export a paginated document
pub trait DocumentRenderer: Send + Sync + 'static {
    fn capture(
        &self,
        url: &str,
        options: &CaptureRenderOptions,
    ) -> impl Future<Output = Result<CapturedDocument, RenderError>> + Send;
}

impl<R: PageRenderer> PageRenderer for std::sync::Arc<R> {
    fn render(
        &self,
        url: &str,
        options: &RenderOptions,
    ) -> impl Future<Output = Result<RenderedPage, RenderError>> + Send {
        (**self).render(url, options)
    }
}

impl<R: DocumentRenderer> DocumentRenderer for std::sync::Arc<R> {
    fn capture(
        &self,
        url: &str,
        options: &CaptureRenderOptions,
    ) -> impl Future<Output = Result<CapturedDocument, RenderError>> + Send {
        (**self).capture(url, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_suspected_after_timeouts_and_cdp_failures() {
        let timeout = RenderError::Timeout {
            operation: "navigation".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(timeout.implicates_engine());
        assert!(RenderError::Engine("target closed".into()).implicates_engine());
        assert!(!RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()).implicates_engine());
        assert!(RenderError::Pool(PoolError::Engine("context refused".into())).implicates_engine());
        assert!(!RenderError::Pool(PoolError::ShuttingDown).implicates_engine());
    }
}
