//! Sub-site discovery for multi-site organisations
//!
//! Tries the base site's sitemap first and falls back to scanning the
//! rendered home page for links. Either way, page URLs are reduced to
//! sub-site roots (a subdomain or a first-level path) before filtering.

pub mod roots;
pub mod sitemap;

pub use roots::{representative_sample, subsite_root};

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::renderer::{PageRenderer, RenderError, RenderOptions};
use crate::site_mapper::signals::extract_links;
use crate::utils::{REPRESENTATIVE_SAMPLE_SIZE, parse_target_url};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverRequest {
    pub base_url: String,
    /// Keep only sites whose URL or link label contains this text
    pub region_hint: Option<String>,
    /// Return an evenly spaced sample instead of every site
    pub representative_only: bool,
}

impl DiscoverRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Sitemap,
    LinkScan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSite {
    pub url: String,
    /// Anchor text when found by link scan
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub sites: Vec<DiscoveredSite>,
    pub method: DiscoveryMethod,
    /// Sites matching the region hint, before sampling
    pub total_found: usize,
    pub total_returned: usize,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("link scan failed: {0}")]
    LinkScan(#[from] RenderError),
}

/// Keep the first occurrence of each root, in order
fn dedup_roots(base: &Url, candidates: impl IntoIterator<Item = (Url, Option<String>)>) -> Vec<DiscoveredSite> {
    let mut seen = HashSet::new();
    let mut sites = Vec::new();
    for (candidate, label) in candidates {
        if let Some(root) = subsite_root(base, &candidate)
            && seen.insert(root.to_string())
        {
            sites.push(DiscoveredSite {
                url: root.to_string(),
                label,
            });
        }
    }
    sites
}

fn matches_region(site: &DiscoveredSite, hint: &str) -> bool {
    site.url.to_lowercase().contains(hint)
        || site
            .label
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(hint))
}

/// Finds the sub-sites of a base site
pub struct SubsiteDiscovery<R> {
    client: Client,
    renderer: R,
    timeout: Duration,
}

impl<R: PageRenderer> SubsiteDiscovery<R> {
    pub fn new(renderer: R, timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            renderer,
            timeout,
        })
    }

    async fn from_sitemap(&self, base: &Url) -> Vec<DiscoveredSite> {
        match sitemap::collect_page_urls(&self.client, base, self.timeout).await {
            Ok(pages) => {
                debug!("Sitemap for {base} lists {} pages", pages.len());
                dedup_roots(base, pages.into_iter().map(|u| (u, None)))
            }
            Err(e) => {
                debug!("No usable sitemap for {base}: {e:#}");
                Vec::new()
            }
        }
    }

    async fn from_link_scan(&self, base: &Url) -> Result<Vec<DiscoveredSite>, RenderError> {
        let options = RenderOptions {
            timeout: self.timeout,
            ..RenderOptions::default()
        };
        let page = self.renderer.render(base.as_str(), &options).await?;
        let page_url = Url::parse(&page.final_url).unwrap_or_else(|_| base.clone());
        let document = scraper::Html::parse_document(&page.html);
        let links = extract_links(&document, &page_url);
        debug!("Link scan of {base} found {} links", links.len());
        Ok(dedup_roots(base, links.into_iter().map(|l| (l.url, l.anchor_text))))
    }

    pub async fn discover(&self, request: &DiscoverRequest) -> Result<DiscoveryResult, DiscoveryError> {
        let base = parse_target_url(&request.base_url)
            .map_err(|e| DiscoveryError::InvalidUrl(e.to_string()))?;

        let mut method = DiscoveryMethod::Sitemap;
        let mut sites = self.from_sitemap(&base).await;
        if sites.is_empty() {
            info!("Sitemap yielded no sub-sites for {base}; scanning links");
            method = DiscoveryMethod::LinkScan;
            sites = match self.from_link_scan(&base).await {
                Ok(sites) => sites,
                Err(e) => {
                    warn!("Link scan of {base} failed: {e}");
                    return Err(e.into());
                }
            };
        }

        if let Some(hint) = request
            .region_hint
            .as_deref()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
        {
            sites.retain(|site| matches_region(site, &hint));
        }

        let total_found = sites.len();
        if request.representative_only {
            sites = representative_sample(&sites, REPRESENTATIVE_SAMPLE_SIZE);
        }

        info!(
            "Discovered {total_found} sub-sites under {base} via {method:?}, returning {}",
            sites.len()
        );
        Ok(DiscoveryResult {
            total_returned: sites.len(),
            sites,
            method,
            total_found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderedPage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Home page with school links; counts renders
    #[derive(Default)]
    struct HomePage {
        html: String,
        renders: AtomicUsize,
    }

    impl PageRenderer for HomePage {
        async fn render(&self, url: &str, _options: &RenderOptions) -> Result<RenderedPage, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.html.is_empty() {
                return Err(RenderError::Navigation("net::ERR_CONNECTION_RESET".into()));
            }
            Ok(RenderedPage {
                requested_url: url.to_string(),
                final_url: url.to_string(),
                status: Some(200),
                html: self.html.clone(),
                ..RenderedPage::default()
            })
        }
    }

    fn discovery(html: &str) -> SubsiteDiscovery<HomePage> {
        let renderer = HomePage {
            html: html.to_string(),
            ..HomePage::default()
        };
        SubsiteDiscovery::new(renderer, Duration::from_secs(5)).unwrap()
    }

    fn urlset(base: &str, paths: &[&str]) -> String {
        let entries: String = paths
            .iter()
            .map(|p| format!("<url><loc>{base}{p}</loc></url>"))
            .collect();
        format!(r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#)
    }

    #[tokio::test]
    async fn test_sitemap_roots() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let body = urlset(&base, &["/", "/lincoln/", "/lincoln/bell-schedule", "/news/1", "/washington/about"]);
        let _m = server.mock("GET", "/sitemap.xml").with_body(body).create_async().await;

        let discovery = discovery("");
        let result = discovery.discover(&DiscoverRequest::new(&base)).await.unwrap();

        assert_eq!(result.method, DiscoveryMethod::Sitemap);
        let urls: Vec<&str> = result.sites.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec![format!("{base}/lincoln/"), format!("{base}/washington/")]);
        assert_eq!(result.total_found, 2);
        assert_eq!(discovery.renderer.renders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sitemap_index_followed_one_level() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let index = format!(
            r#"<?xml version="1.0"?><sitemapindex><sitemap><loc>{base}/schools.xml</loc></sitemap><sitemap><loc>{base}/missing.xml</loc></sitemap></sitemapindex>"#
        );
        let _index = server.mock("GET", "/sitemap.xml").with_body(index).create_async().await;
        let _child = server
            .mock("GET", "/schools.xml")
            .with_body(urlset(&base, &["/adams/", "/jefferson/home"]))
            .create_async()
            .await;
        let _missing = server.mock("GET", "/missing.xml").with_status(404).create_async().await;

        let result = discovery("").discover(&DiscoverRequest::new(&base)).await.unwrap();

        assert_eq!(result.method, DiscoveryMethod::Sitemap);
        assert_eq!(result.total_found, 2);
    }

    #[tokio::test]
    async fn test_link_scan_fallback_with_region_hint() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _m = server.mock("GET", "/sitemap.xml").with_status(404).create_async().await;
        let html = r#"<a href="/north-elementary/">North Elementary</a>
                      <a href="/south-middle/">South Middle</a>
                      <a href="/ridge/">Northridge High</a>
                      <a href="/contact">Contact</a>"#;

        let discovery = discovery(html);
        let mut request = DiscoverRequest::new(&base);
        request.region_hint = Some("North".to_string());
        let result = discovery.discover(&request).await.unwrap();

        assert_eq!(result.method, DiscoveryMethod::LinkScan);
        let labels: Vec<_> = result.sites.iter().filter_map(|s| s.label.as_deref()).collect();
        assert_eq!(labels, vec!["North Elementary", "Northridge High"]);
        assert_eq!(discovery.renderer.renders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_representative_sample_caps_results() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let paths: Vec<String> = (0..12).map(|i| format!("/school-{i:02}/")).collect();
        let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let _m = server
            .mock("GET", "/sitemap.xml")
            .with_body(urlset(&base, &path_refs))
            .create_async()
            .await;

        let mut request = DiscoverRequest::new(&base);
        request.representative_only = true;
        let result = discovery("").discover(&request).await.unwrap();

        assert_eq!(result.total_found, 12);
        assert_eq!(result.total_returned, 5);
        assert_eq!(result.sites[0].url, format!("{base}/school-00/"));
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty_not_error() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _m = server.mock("GET", "/sitemap.xml").with_status(404).create_async().await;

        let result = discovery("<p>No links here</p>")
            .discover(&DiscoverRequest::new(&base))
            .await
            .unwrap();
        assert!(result.sites.is_empty());
        assert_eq!(result.total_returned, 0);
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let err = discovery("").discover(&DiscoverRequest::new("district.org")).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidUrl(_)));
    }
}
