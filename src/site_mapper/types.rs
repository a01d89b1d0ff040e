//! Request and result types for site mapping

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-page ranking signals collected while mapping a site
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrawlPageRecord {
    pub url: String,
    /// Number of link hops from the start page
    pub depth: u8,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Text of the first `<h1>`
    pub primary_heading: Option<String>,
    pub breadcrumb: Option<String>,
    /// Anchor text of the link the crawl followed to reach this page
    pub anchor_text: Option<String>,
    /// Clock-time patterns such as `8:05 AM` in the visible text
    pub time_pattern_count: usize,
    /// Page links to a schedule-labelled document (PDF, Word, spreadsheet)
    pub has_schedule_document_link: bool,
    /// Total occurrences of the configured keywords in the visible text
    pub keyword_hits: usize,
    /// Distinct http(s) links on the page, any origin
    pub outbound_link_count: usize,
}

/// A site map request; unset limits fall back to the mapper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapRequest {
    pub start_url: String,
    pub max_pages: Option<usize>,
    pub max_depth: Option<u8>,
    /// Glob patterns (`*` wildcard) a discovered path must match
    pub include_patterns: Vec<String>,
    /// Glob patterns that exclude a discovered path
    pub exclude_patterns: Vec<String>,
    /// Overrides the configured keyword list
    pub keywords: Option<Vec<String>>,
}

impl MapRequest {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[must_use]
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}

/// Everything a site map run produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapResult {
    pub start_url: String,
    /// Records in breadth-first order by depth
    pub pages: Vec<CrawlPageRecord>,
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub pages_with_time_patterns: usize,
    pub pages_with_keywords: usize,
    pub elapsed_ms: u64,
}

/// Errors that stop a site map before any page is rendered
#[derive(Debug, Error)]
pub enum MapError {
    #[error("invalid start url: {0}")]
    InvalidUrl(String),

    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
