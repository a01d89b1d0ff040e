//! Depth-bounded, same-origin site mapping
//!
//! The mapper walks a site breadth-first one depth level at a time, rendering
//! each page through a [`PageRenderer`] and recording the signals downstream
//! ranking needs. It owns its frontier and visited set; it never goes through
//! the scheduling queue. Pages that fail to render, come back blocked or
//! report not-found are logged, counted and skipped.

pub mod frontier;
pub mod signals;
pub mod types;

pub use frontier::{Frontier, FrontierItem, PathFilter};
pub use signals::{DiscoveredLink, PageSignals, extract_signals};
pub use types::{CrawlPageRecord, MapError, MapRequest, MapResult};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::MapperConfig;
use crate::fetch_executor::block_detection;
use crate::renderer::{PageRenderer, RenderError, RenderOptions, RenderedPage};
use crate::utils::parse_target_url;

/// Why a visited page produced no record
#[derive(Debug)]
enum VisitFailure {
    Render(RenderError),
    Blocked(String),
    NotFound(u16),
}

impl std::fmt::Display for VisitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(e) => write!(f, "{e}"),
            Self::Blocked(rule) => write!(f, "blocked by access control ({rule})"),
            Self::NotFound(status) => write!(f, "not found (HTTP {status})"),
        }
    }
}

/// Breadth-first crawler producing [`CrawlPageRecord`]s
pub struct SiteMapper<R> {
    renderer: R,
    config: MapperConfig,
}

impl<R: PageRenderer> SiteMapper<R> {
    pub fn new(renderer: R, config: MapperConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Render one frontier item, sleeping the polite delay first unless it is the start page
    async fn visit(
        &self,
        item: FrontierItem,
        options: &RenderOptions,
        delay: Duration,
    ) -> (FrontierItem, Result<RenderedPage, VisitFailure>) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!("Mapping {} (depth {})", item.url, item.depth);

        let outcome = match self.renderer.render(item.url.as_str(), options).await {
            Ok(page) => {
                let block = block_detection::detect(&page.html, page.status);
                if block.is_blocked() {
                    Err(VisitFailure::Blocked(
                        block.matched_rule.unwrap_or_else(|| "unknown".to_string()),
                    ))
                } else if let Some(status @ (404 | 410)) = page.status {
                    Err(VisitFailure::NotFound(status))
                } else {
                    Ok(page)
                }
            }
            Err(e) => Err(VisitFailure::Render(e)),
        };
        (item, outcome)
    }

    /// Map a site starting at `request.start_url`
    pub async fn map(&self, request: &MapRequest) -> Result<MapResult, MapError> {
        let start = parse_target_url(&request.start_url)
            .map_err(|e| MapError::InvalidUrl(e.to_string()))?;
        let filter = PathFilter::new(&request.include_patterns, &request.exclude_patterns)?;

        let max_pages = request.max_pages.unwrap_or(self.config.max_pages).max(1);
        let max_depth = request.max_depth.unwrap_or(self.config.max_depth);
        let keywords = request.keywords.as_deref().unwrap_or(&self.config.keywords);
        let concurrency = self.config.page_concurrency.max(1);
        let options = RenderOptions {
            timeout: self.config.navigation_timeout(),
            settle_delay: Duration::ZERO,
            export: None,
        };

        info!("Mapping {start} (max pages {max_pages}, max depth {max_depth})");
        let started = Instant::now();
        let mut result = MapResult {
            start_url: start.to_string(),
            ..MapResult::default()
        };
        let mut frontier = Frontier::new(start, max_depth, filter);
        let mut attempted = 0usize;

        while attempted < max_pages {
            let level = frontier.next_level();
            if level.is_empty() {
                break;
            }

            let mut pending = level.into_iter();
            let mut active = FuturesUnordered::new();
            loop {
                // Fill up to the concurrency limit
                while active.len() < concurrency && attempted < max_pages {
                    let Some(item) = pending.next() else { break };
                    let delay = if attempted == 0 {
                        Duration::ZERO
                    } else {
                        self.config.page_delay()
                    };
                    attempted += 1;
                    active.push(self.visit(item, &options, delay));
                }

                let Some((item, outcome)) = active.next().await else {
                    break;
                };
                match outcome {
                    Ok(page) => {
                        let record = self.record_page(&mut frontier, item, &page, keywords);
                        result.pages.push(record);
                    }
                    Err(failure) => {
                        warn!("Skipping {} at depth {}: {failure}", item.url, item.depth);
                        result.pages_failed += 1;
                    }
                }
            }
        }

        if attempted >= max_pages && !frontier.is_empty() {
            info!(
                "Reached page limit of {max_pages}; {} queued pages not visited",
                frontier.pending()
            );
        }

        result.pages_visited = result.pages.len();
        result.pages_with_time_patterns =
            result.pages.iter().filter(|p| p.time_pattern_count > 0).count();
        result.pages_with_keywords = result.pages.iter().filter(|p| p.keyword_hits > 0).count();
        result.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Mapped {}: {} pages, {} failed, {} with times, {} with keywords in {}ms",
            result.start_url,
            result.pages_visited,
            result.pages_failed,
            result.pages_with_time_patterns,
            result.pages_with_keywords,
            result.elapsed_ms
        );
        Ok(result)
    }

    /// Extract signals from a rendered page and enqueue its same-origin links one level deeper
    fn record_page(
        &self,
        frontier: &mut Frontier,
        item: FrontierItem,
        page: &RenderedPage,
        keywords: &[String],
    ) -> CrawlPageRecord {
        let base = Url::parse(&page.final_url).unwrap_or_else(|_| item.url.clone());
        let signals = extract_signals(&page.html, &base, keywords);
        let outbound_link_count = signals.links.len();

        if item.depth == 0 {
            frontier.rebase(&base);
        }
        if let Some(next_depth) = item.depth.checked_add(1) {
            let accepted = signals
                .links
                .into_iter()
                .filter(|link| frontier.offer(link.clone(), next_depth))
                .count();
            debug!("{}: {outbound_link_count} links, {accepted} enqueued", item.url);
        }

        CrawlPageRecord {
            url: item.url.to_string(),
            depth: item.depth,
            title: signals.title.or_else(|| page.title.clone()),
            meta_description: signals.meta_description,
            primary_heading: signals.primary_heading,
            breadcrumb: signals.breadcrumb,
            anchor_text: item.anchor_text,
            time_pattern_count: signals.time_pattern_count,
            has_schedule_document_link: signals.has_schedule_document_link,
            keyword_hits: signals.keyword_hits,
            outbound_link_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned HTML by URL and records every render
    #[derive(Default)]
    struct SiteFixture {
        pages: HashMap<String, (u16, String)>,
        redirects: HashMap<String, String>,
        rendered: Mutex<Vec<String>>,
    }

    impl SiteFixture {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), (200, html.to_string()));
            self
        }

        fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        fn status_page(mut self, url: &str, status: u16, html: &str) -> Self {
            self.pages.insert(url.to_string(), (status, html.to_string()));
            self
        }

        fn rendered(&self) -> Vec<String> {
            self.rendered.lock().unwrap().clone()
        }
    }

    impl PageRenderer for SiteFixture {
        async fn render(&self, url: &str, _options: &RenderOptions) -> Result<RenderedPage, RenderError> {
            self.rendered.lock().unwrap().push(url.to_string());
            let served = self.redirects.get(url).map_or(url, String::as_str);
            match self.pages.get(served) {
                Some((status, html)) => Ok(RenderedPage {
                    requested_url: url.to_string(),
                    final_url: served.to_string(),
                    status: Some(*status),
                    html: html.clone(),
                    title: None,
                    document: None,
                }),
                None => Err(RenderError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED {url}"))),
            }
        }
    }

    fn config() -> MapperConfig {
        MapperConfig {
            page_delay_ms: 0,
            ..MapperConfig::default()
        }
    }

    fn urls(result: &MapResult) -> Vec<&str> {
        result.pages.iter().map(|p| p.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_same_origin_depth_one_excludes_cross_origin() {
        let site = SiteFixture::default()
            .page(
                "https://a.example.org/",
                r#"<a href="/b">Bell schedule</a><a href="https://c.example.net/">Partner</a>"#,
            )
            .page("https://a.example.org/b", r#"<h1>B</h1><a href="/deeper">Deeper</a>"#)
            .page("https://c.example.net/", "<h1>C</h1>")
            .page("https://a.example.org/deeper", "<h1>Too deep</h1>");
        let mapper = SiteMapper::new(site, config());

        let result = mapper
            .map(&MapRequest::new("https://a.example.org/").with_max_depth(1))
            .await
            .unwrap();

        assert_eq!(urls(&result), vec!["https://a.example.org/", "https://a.example.org/b"]);
        assert_eq!(result.pages[0].depth, 0);
        assert_eq!(result.pages[1].depth, 1);
        assert_eq!(result.pages[1].anchor_text.as_deref(), Some("Bell schedule"));
        assert_eq!(result.pages[0].outbound_link_count, 2);
        assert_eq!(result.pages_visited, 2);
        assert_eq!(
            mapper.renderer.rendered(),
            vec!["https://a.example.org/", "https://a.example.org/b"]
        );
    }

    #[tokio::test]
    async fn test_redirected_start_page_keeps_its_links() {
        let site = SiteFixture::default()
            .redirect("https://example.org/", "https://www.example.org/")
            .page(
                "https://www.example.org/",
                r#"<a href="/about">About</a><a href="/">Home</a>"#,
            )
            .page("https://www.example.org/about", "<h1>About</h1>");
        let mapper = SiteMapper::new(site, config());

        let result = mapper.map(&MapRequest::new("https://example.org/")).await.unwrap();

        assert_eq!(
            urls(&result),
            vec!["https://example.org/", "https://www.example.org/about"]
        );
        assert_eq!(
            mapper.renderer.rendered(),
            vec!["https://example.org/", "https://www.example.org/about"]
        );
    }

    #[tokio::test]
    async fn test_failed_pages_are_skipped_not_fatal() {
        let site = SiteFixture::default()
            .page(
                "https://example.org/",
                r#"<a href="/missing">Missing</a><a href="/gone">Gone</a><a href="/guarded">Guarded</a><a href="/ok">Ok</a>"#,
            )
            .status_page("https://example.org/gone", 404, "<h1>Not Found</h1>")
            .page("https://example.org/guarded", "<p>Checking your browser before accessing</p>")
            .page("https://example.org/ok", "<p>Doors open at 7:45 am</p>");
        let mapper = SiteMapper::new(site, config());

        let result = mapper.map(&MapRequest::new("https://example.org/")).await.unwrap();

        assert_eq!(urls(&result), vec!["https://example.org/", "https://example.org/ok"]);
        assert_eq!(result.pages_failed, 3);
        assert_eq!(result.pages_with_time_patterns, 1);
    }

    #[tokio::test]
    async fn test_page_limit_bounds_renders() {
        let links: String = (0..10).map(|i| format!(r#"<a href="/p{i}">P{i}</a>"#)).collect();
        let mut site = SiteFixture::default().page("https://example.org/", &links);
        for i in 0..10 {
            site = site.page(&format!("https://example.org/p{i}"), "<p>page</p>");
        }
        let mapper = SiteMapper::new(site, config());

        let result = mapper
            .map(&MapRequest::new("https://example.org/").with_max_pages(4))
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 4);
        assert_eq!(mapper.renderer.rendered().len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_links_visited_once() {
        let site = SiteFixture::default()
            .page(
                "https://example.org/",
                r#"<a href="/a">A</a><a href="/a/">A again</a><a href="/a#top">A top</a>"#,
            )
            .page("https://example.org/a", r#"<a href="/">Home</a>"#);
        let mapper = SiteMapper::new(site, config());

        let result = mapper.map(&MapRequest::new("https://example.org/")).await.unwrap();

        assert_eq!(result.pages_visited, 2);
        assert_eq!(mapper.renderer.rendered().len(), 2);
    }

    #[tokio::test]
    async fn test_path_filters_apply_to_discovered_links() {
        let site = SiteFixture::default()
            .page(
                "https://example.org/",
                r#"<a href="/schools/a">A</a><a href="/news/1">News</a><a href="/schools/archive/x">Old</a>"#,
            )
            .page("https://example.org/schools/a", "<p>a</p>")
            .page("https://example.org/news/1", "<p>news</p>")
            .page("https://example.org/schools/archive/x", "<p>old</p>");
        let mapper = SiteMapper::new(site, config());

        let request = MapRequest::new("https://example.org/")
            .include("/schools/*")
            .exclude("*/archive/*");
        let result = mapper.map(&request).await.unwrap();

        assert_eq!(urls(&result), vec!["https://example.org/", "https://example.org/schools/a"]);
    }

    #[tokio::test]
    async fn test_keyword_counts_use_request_override() {
        let site = SiteFixture::default().page("https://example.org/", "<p>Horario de clases</p>");
        let mapper = SiteMapper::new(site, config());

        let mut request = MapRequest::new("https://example.org/");
        request.keywords = Some(vec!["horario".to_string()]);
        let result = mapper.map(&request).await.unwrap();

        assert_eq!(result.pages[0].keyword_hits, 1);
        assert_eq!(result.pages_with_keywords, 1);
    }

    #[tokio::test]
    async fn test_invalid_start_url_rejected_before_rendering() {
        let mapper = SiteMapper::new(SiteFixture::default(), config());

        let err = mapper.map(&MapRequest::new("not a url")).await.unwrap_err();
        assert!(matches!(err, MapError::InvalidUrl(_)));
        let err = mapper.map(&MapRequest::new("ftp://example.org/")).await.unwrap_err();
        assert!(matches!(err, MapError::InvalidUrl(_)));
        assert!(mapper.renderer.rendered().is_empty());
    }
}
