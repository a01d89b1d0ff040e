//! Signal extraction from a rendered page

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::utils::{element_text, visible_text_of};

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

static META_DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
        .expect("BUG: hardcoded CSS selector for meta description is invalid")
});

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1").expect("BUG: hardcoded CSS selector 'h1' is invalid")
});

static BREADCRUMB_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"nav[aria-label*="readcrumb"], .breadcrumb, .breadcrumbs, #breadcrumbs, [itemtype*="BreadcrumbList"]"#,
    )
    .expect("BUG: hardcoded CSS selector for breadcrumbs is invalid")
});

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});

/// Clock times: `8:05`, `8:05 am`, `14:30`, `3:15 p.m.`
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[01]?\d|2[0-3]):[0-5]\d(?:\s*[ap]\.?m\b\.?)?")
        .expect("BUG: hardcoded time regex is invalid")
});

const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".xls", ".xlsx"];
const SCHEDULE_TERMS: &[&str] = &["schedule", "bell", "timetable"];

/// A link found on a page, resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: Url,
    pub anchor_text: Option<String>,
}

/// What the mapper keeps from one page
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub primary_heading: Option<String>,
    pub breadcrumb: Option<String>,
    pub time_pattern_count: usize,
    pub has_schedule_document_link: bool,
    pub keyword_hits: usize,
    /// Distinct http(s) links in document order, fragments removed
    pub links: Vec<DiscoveredLink>,
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Count clock-time patterns in lower-cased text
pub fn count_time_patterns(text: &str) -> usize {
    TIME_PATTERN.find_iter(text).count()
}

/// Total occurrences of every keyword in lower-cased text
pub fn count_keyword_hits(text: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .map(|k| text.matches(k.as_str()).count())
        .sum()
}

fn is_document_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || url.host_str() == Some("docs.google.com")
}

fn mentions_schedule(label: &str) -> bool {
    let label = label.to_lowercase();
    SCHEDULE_TERMS.iter().any(|term| label.contains(term))
}

/// Resolve every anchor on the page to an absolute http(s) URL
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<DiscoveredLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(mut resolved) = page_url.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        if seen.insert(resolved.as_str().to_string()) {
            links.push(DiscoveredLink {
                url: resolved,
                anchor_text: non_empty(element_text(&anchor)),
            });
        }
    }

    links
}

/// Extract every ranking signal from one rendered page
pub fn extract_signals(html: &str, page_url: &Url, keywords: &[String]) -> PageSignals {
    let document = Html::parse_document(html);
    let text = visible_text_of(&document);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(|t| non_empty(element_text(&t)));
    let meta_description = document
        .select(&META_DESCRIPTION_SELECTOR)
        .find_map(|m| m.value().attr("content"))
        .and_then(|c| non_empty(c.split_whitespace().collect::<Vec<_>>().join(" ")));
    let primary_heading = document
        .select(&H1_SELECTOR)
        .find_map(|h| non_empty(element_text(&h)));
    let breadcrumb = document
        .select(&BREADCRUMB_SELECTOR)
        .find_map(|b| non_empty(element_text(&b)));

    let links = extract_links(&document, page_url);
    let has_schedule_document_link = links.iter().any(|link| {
        is_document_url(&link.url)
            && (mentions_schedule(link.url.path())
                || link.anchor_text.as_deref().is_some_and(mentions_schedule))
    });

    PageSignals {
        title,
        meta_description,
        primary_heading,
        breadcrumb,
        time_pattern_count: count_time_patterns(&text),
        has_schedule_document_link,
        keyword_hits: count_keyword_hits(&text, keywords),
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html>
<head>
  <title> Lincoln Elementary | Bell Schedule </title>
  <meta name="description" content="Daily   bell schedule for Lincoln">
  <script>var start = "7:00 am";</script>
</head>
<body>
  <nav aria-label="Breadcrumb"><a href="/">Home</a> &gt; <a href="/schools">Schools</a></nav>
  <h1>Bell Schedule</h1>
  <p>School starts at 8:05 AM and ends at 2:45 p.m. Early release 12:30.</p>
  <a href="/docs/bell-schedule-2025.pdf">Download</a>
  <a href="/about#staff">About us</a>
  <a href="/about">About again</a>
  <a href="https://other.example.net/">Partner</a>
  <a href="mailto:office@example.org">Email</a>
  <a href="#top">Top</a>
</body>
</html>"##;

    fn page_url() -> Url {
        Url::parse("https://example.org/schools/lincoln").unwrap()
    }

    #[test]
    fn test_extracts_text_signals() {
        let keywords = vec!["bell schedule".to_string()];
        let signals = extract_signals(PAGE, &page_url(), &keywords);

        assert_eq!(signals.title.as_deref(), Some("Lincoln Elementary | Bell Schedule"));
        assert_eq!(signals.meta_description.as_deref(), Some("Daily bell schedule for Lincoln"));
        assert_eq!(signals.primary_heading.as_deref(), Some("Bell Schedule"));
        assert_eq!(signals.breadcrumb.as_deref(), Some("Home > Schools"));
        // title, h1; the script copy is not visible text
        assert_eq!(signals.keyword_hits, 2);
        assert_eq!(signals.time_pattern_count, 3);
        assert!(signals.has_schedule_document_link);
    }

    #[test]
    fn test_links_are_resolved_and_deduplicated() {
        let signals = extract_signals(PAGE, &page_url(), &[]);
        let urls: Vec<&str> = signals.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.org/",
                "https://example.org/schools",
                "https://example.org/docs/bell-schedule-2025.pdf",
                "https://example.org/about",
                "https://other.example.net/",
            ]
        );
        assert_eq!(signals.links[3].anchor_text.as_deref(), Some("About us"));
    }

    #[test]
    fn test_unlabelled_pdf_is_not_a_schedule_link() {
        let html = r#"<html><body><a href="/files/menu.pdf">Lunch menu</a></body></html>"#;
        assert!(!extract_signals(html, &page_url(), &[]).has_schedule_document_link);
    }

    #[test]
    fn test_time_patterns() {
        assert_eq!(count_time_patterns("8:00 am - 3:15 pm"), 2);
        assert_eq!(count_time_patterns("period 1 14:30"), 1);
        assert_eq!(count_time_patterns("ratio 3:1 and 25:99"), 0);
    }

    #[test]
    fn test_keyword_hits_ignore_blank_keywords() {
        let keywords = vec!["Schedule".to_string(), "  ".to_string()];
        assert_eq!(count_keyword_hits("schedule and bell schedule", &keywords), 2);
    }

    #[test]
    fn test_empty_page_has_no_signals() {
        let signals = extract_signals("<html><body></body></html>", &page_url(), &[]);
        assert!(signals.title.is_none());
        assert!(signals.primary_heading.is_none());
        assert!(signals.links.is_empty());
        assert_eq!(signals.time_pattern_count, 0);
    }
}
