//! URL helpers shared by the queue, mapper, capturer and boundary service.

use anyhow::Result;
use url::Url;

/// Check if a URL is an absolute http(s) URL with a host
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Parse and validate a target address supplied by a caller
pub fn parse_target_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if !is_valid_url(trimmed) {
        return Err(anyhow::anyhow!(
            "'{url}' is not an absolute http(s) URL"
        ));
    }
    Url::parse(trimmed).map_err(|e| anyhow::anyhow!("Failed to parse URL '{url}': {e}"))
}

/// Origin (lower-cased hostname) used as the unit of rate limiting
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Normalize a URL for visited-set deduplication.
///
/// Strips the fragment, lower-cases scheme and host (done by `url`), drops a
/// default port, removes a trailing slash from non-root paths, and sorts the
/// query pairs so parameter order does not create distinct keys.
pub fn normalize_url(url: &str) -> Result<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| anyhow::anyhow!("Failed to parse URL for normalization: {e}"))?;
    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        pairs.sort();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(parsed.to_string())
}

/// Whether `candidate` is served from the same origin as `base`
#[must_use]
pub fn same_origin(base: &Url, candidate: &Url) -> bool {
    base.scheme() == candidate.scheme()
        && base.host_str().map(str::to_ascii_lowercase)
            == candidate.host_str().map(str::to_ascii_lowercase)
        && base.port_or_known_default() == candidate.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/path?q=1"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("/relative/path"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(origin_of("https://Example.COM/a"), Some("example.com".to_string()));
        assert_eq!(
            origin_of("http://sub.example.com:8080/x"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://example.com/page#section").expect("valid url"),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("https://example.com/page/").expect("valid url"),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("https://EXAMPLE.com:443/").expect("valid url"),
            "https://example.com/"
        );
        assert!(normalize_url("::nope").is_err());
    }

    #[test]
    fn test_normalize_url_query_order() {
        assert_eq!(
            normalize_url("https://example.com/cal?month=9&school=lincoln").expect("valid url"),
            normalize_url("https://example.com/cal?school=lincoln&month=9").expect("valid url"),
        );
        assert_eq!(
            normalize_url("https://example.com/cal?b=2&a=1").expect("valid url"),
            "https://example.com/cal?a=1&b=2"
        );
        assert_eq!(
            normalize_url("https://example.com/cal?").expect("valid url"),
            "https://example.com/cal"
        );
    }

    #[test]
    fn test_same_origin() {
        let base = Url::parse("https://example.com/a").expect("valid url");
        let same = Url::parse("https://example.com/b/c").expect("valid url");
        let other_host = Url::parse("https://other.com/").expect("valid url");
        let other_scheme = Url::parse("http://example.com/").expect("valid url");
        assert!(same_origin(&base, &same));
        assert!(!same_origin(&base, &other_host));
        assert!(!same_origin(&base, &other_scheme));
    }
}
