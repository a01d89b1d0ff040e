use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::renderer::DocumentOptions;

/// A batch of pages to export as paginated documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRequest {
    pub urls: Vec<String>,
    /// Falls back to the configured output directory
    pub output_dir: Option<PathBuf>,
    /// Page format, scale and margins; defaults when omitted
    pub document: Option<DocumentOptions>,
}

impl CaptureRequest {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_document(mut self, document: DocumentOptions) -> Self {
        self.document = Some(document);
        self
    }
}

/// Result of capturing one URL
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub url: String,
    pub success: bool,
    pub output_path: Option<PathBuf>,
    /// Size of the written document
    pub bytes: u64,
    pub title: Option<String>,
    /// A blocking overlay was clicked away or removed before export
    pub modals_dismissed: bool,
    pub error: Option<String>,
}

/// Records in request order plus totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureResult {
    pub output_dir: PathBuf,
    pub records: Vec<CaptureRecord>,
    pub captured: usize,
    pub failed: usize,
    pub modals_dismissed: usize,
    pub total_bytes: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no urls to capture")]
    NoTargets,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
