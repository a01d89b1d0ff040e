//! Reducing page URLs to sub-site roots

use url::{Host, Url};

/// First path segments that name site sections rather than sub-sites
const SECTION_SEGMENTS: &[&str] = &[
    "about", "assets", "calendar", "category", "contact", "css", "events", "feed", "files",
    "images", "img", "js", "login", "news", "page", "search", "sitemap", "static", "tag",
    "uploads", "wp-admin", "wp-content", "wp-includes",
];

/// Host with a leading `www.` removed, lower-cased
fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn is_domain(url: &Url) -> bool {
    matches!(url.host(), Some(Host::Domain(_)))
}

/// The sub-site root `candidate` belongs to, relative to the district site `base`.
///
/// A different host under the base host (`lincoln.district.org` under
/// `district.org`) yields that host's root. A page on the base host yields its
/// first path segment (`/lincoln/`), unless that segment is a common site
/// section or looks like a file.
pub fn subsite_root(base: &Url, candidate: &Url) -> Option<Url> {
    if !matches!(candidate.scheme(), "http" | "https") {
        return None;
    }
    let base_host = bare_host(base)?;
    let candidate_host = bare_host(candidate)?;

    if candidate_host != base_host {
        if !is_domain(base) || !candidate_host.ends_with(&format!(".{base_host}")) {
            return None;
        }
        let mut root = candidate.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        return Some(root);
    }

    let segment = candidate
        .path_segments()?
        .find(|s| !s.is_empty())?
        .to_ascii_lowercase();
    if segment.contains('.') || SECTION_SEGMENTS.contains(&segment.as_str()) {
        return None;
    }

    let mut root = candidate.clone();
    root.set_path(&format!("/{segment}/"));
    root.set_query(None);
    root.set_fragment(None);
    Some(root)
}

/// Evenly spaced sample of at most `n` items, first item always included
pub fn representative_sample<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    if n == 0 {
        return Vec::new();
    }
    if items.len() <= n {
        return items.to_vec();
    }
    (0..n).map(|i| items[i * items.len() / n].clone()).collect()
}
