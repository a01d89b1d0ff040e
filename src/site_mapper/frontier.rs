//! Breadth-first crawl frontier with same-origin and path filtering

use regex::Regex;
use std::collections::{HashSet, VecDeque};
use url::Url;

use super::signals::DiscoveredLink;
use super::types::MapError;
use crate::utils::{normalize_url, same_origin};

/// Compile a path glob into an anchored regex; `*` matches any run of characters
fn compile_path_glob(pattern: &str) -> Result<Regex, MapError> {
    let escaped = regex::escape(pattern.trim()).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$")).map_err(|e| MapError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Include/exclude globs applied to discovered URL paths
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, MapError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| compile_path_glob(p))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Exclusion wins; an empty include list admits everything
    pub fn allows(&self, path: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(path))
    }
}

/// A page waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: Url,
    pub depth: u8,
    pub anchor_text: Option<String>,
}

/// Pending pages plus everything ever enqueued, keyed by normalized URL
#[derive(Debug)]
pub struct Frontier {
    origin: Url,
    max_depth: u8,
    filter: PathFilter,
    queue: VecDeque<FrontierItem>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Seed with the start page at depth 0; path filters apply only to discovered links
    pub fn new(start: Url, max_depth: u8, filter: PathFilter) -> Self {
        let mut seen = HashSet::new();
        if let Ok(key) = normalize_url(start.as_str()) {
            seen.insert(key);
        }
        let mut queue = VecDeque::new();
        queue.push_back(FrontierItem {
            url: start.clone(),
            depth: 0,
            anchor_text: None,
        });
        Self {
            origin: start,
            max_depth,
            filter,
            queue,
            seen,
        }
    }

    /// Adopt the origin the start page was actually served from.
    ///
    /// A start URL that redirects (apex to `www`, `http` to `https`) would
    /// otherwise make every link on the served page look cross-origin.
    pub fn rebase(&mut self, served: &Url) {
        if same_origin(&self.origin, served) || !matches!(served.scheme(), "http" | "https") {
            return;
        }
        if let Ok(key) = normalize_url(served.as_str()) {
            self.seen.insert(key);
        }
        self.origin = served.clone();
    }

    /// Enqueue a link found at `depth - 1`; returns whether it was accepted
    pub fn offer(&mut self, link: DiscoveredLink, depth: u8) -> bool {
        if depth > self.max_depth
            || !same_origin(&self.origin, &link.url)
            || !self.filter.allows(link.url.path())
        {
            return false;
        }
        let Ok(key) = normalize_url(link.url.as_str()) else {
            return false;
        };
        if !self.seen.insert(key) {
            return false;
        }
        self.queue.push_back(FrontierItem {
            url: link.url,
            depth,
            anchor_text: link.anchor_text,
        });
        true
    }

    /// Remove and return every pending item at the shallowest queued depth
    pub fn next_level(&mut self) -> Vec<FrontierItem> {
        let Some(depth) = self.queue.front().map(|item| item.depth) else {
            return Vec::new();
        };
        let mut level = Vec::new();
        while self.queue.front().is_some_and(|item| item.depth == depth) {
            if let Some(item) = self.queue.pop_front() {
                level.push(item);
            }
        }
        level
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Distinct URLs ever accepted, including the start page
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
