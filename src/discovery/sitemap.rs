//! Sitemap download and `<loc>` extraction

use anyhow::{Context, Result};
use futures::StreamExt;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::utils::CLIENT_IDENTITY;

/// Largest sitemap body read before giving up
pub const MAX_SITEMAP_BYTES: usize = 10 * 1024 * 1024;

/// Child sitemaps followed from one sitemap index
pub const MAX_CHILD_SITEMAPS: usize = 20;

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("BUG: hardcoded <loc> regex is invalid")
});

static SITEMAP_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<sitemapindex[\s>]").expect("BUG: hardcoded sitemapindex regex is invalid")
});

/// Absolute http(s) URLs listed in `<loc>` elements, entity-decoded
pub fn extract_locs(xml: &str) -> Vec<Url> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str().trim()).into_owned())
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| Url::parse(&raw).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .collect()
}

pub fn is_sitemap_index(xml: &str) -> bool {
    SITEMAP_INDEX_RE.is_match(xml)
}

/// Download one sitemap document with a size cap
pub async fn download(client: &Client, url: &Url, timeout: Duration) -> Result<String> {
    let response = client
        .get(url.as_str())
        .timeout(timeout)
        .header("User-Agent", CLIENT_IDENTITY)
        .header("Accept", "application/xml,text/xml;q=0.9,*/*;q=0.1")
        .send()
        .await
        .with_context(|| format!("Failed to download sitemap {url}"))?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "Sitemap download failed with status: {}",
            response.status()
        ));
    }

    let expected = response.content_length().unwrap_or(0);
    if expected > MAX_SITEMAP_BYTES as u64 {
        return Err(anyhow::anyhow!(
            "Sitemap too large: {expected} bytes exceeds limit of {MAX_SITEMAP_BYTES} bytes"
        ));
    }

    let mut buffer = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read sitemap chunk")?;
        if buffer.len() + chunk.len() > MAX_SITEMAP_BYTES {
            return Err(anyhow::anyhow!(
                "Sitemap exceeded {MAX_SITEMAP_BYTES} bytes while streaming"
            ));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Every page URL listed under `base`'s `/sitemap.xml`, following one level of index
pub async fn collect_page_urls(client: &Client, base: &Url, timeout: Duration) -> Result<Vec<Url>> {
    let root = base.join("/sitemap.xml").context("Failed to build sitemap URL")?;
    let xml = download(client, &root, timeout).await?;

    if !is_sitemap_index(&xml) {
        return Ok(extract_locs(&xml));
    }

    let children = extract_locs(&xml);
    log::debug!("{root} is a sitemap index with {} children", children.len());

    let mut pages = Vec::new();
    for child in children.iter().take(MAX_CHILD_SITEMAPS) {
        match download(client, child, timeout).await {
            // Nested indexes are not followed
            Ok(child_xml) if !is_sitemap_index(&child_xml) => pages.extend(extract_locs(&child_xml)),
            Ok(_) => log::debug!("Skipping nested sitemap index {child}"),
            Err(e) => log::warn!("Skipping child sitemap {child}: {e:#}"),
        }
    }
    Ok(pages)
}
