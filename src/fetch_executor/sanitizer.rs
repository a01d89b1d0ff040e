//! Allowlist HTML sanitizer and Markdown conversion
//!
//! Only structural content tags survive. Unknown tags are unwrapped (their
//! children are kept), dangerous and non-content tags are dropped with their
//! whole subtree, and only a handful of attributes are kept per tag.

use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;
use tracing::warn;

const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "ul", "ol", "li", "dl", "dt", "dd",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td", "caption", "a", "strong", "b", "em",
    "i", "u", "code", "pre", "blockquote", "span", "div", "section", "article", "main",
    "header", "footer", "nav", "time", "abbr", "sub", "sup", "img",
];

const DROPPED_SUBTREES: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "svg", "canvas",
    "form", "button", "input", "select", "textarea", "head", "link", "meta",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: hardcoded selector 'body' is invalid"));

/// Sanitized page content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedContent {
    /// Allowlisted HTML
    pub html: String,
    /// Markdown rendition of `html`
    pub markdown: String,
}

fn allowed_attribute(tag: &str, name: &str, value: &str) -> bool {
    if name.starts_with("on") {
        return false;
    }
    match (tag, name) {
        ("a", "href") => is_safe_url(value, &["http", "https", "mailto"]),
        ("img", "src") => is_safe_url(value, &["http", "https"]),
        ("img", "alt") | ("abbr", "title") | ("time", "datetime") => true,
        ("td" | "th", "colspan" | "rowspan") => value.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Relative references are safe; absolute ones must use an allowed scheme
fn is_safe_url(value: &str, schemes: &[&str]) -> bool {
    let trimmed: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    let scheme_end = trimmed.find(':');
    let path_start = trimmed.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => {
            let scheme = trimmed[..colon].to_ascii_lowercase();
            schemes.contains(&scheme.as_str())
        }
        (None, _) => true,
    }
}

fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            html_escape::encode_text_to_string(&**text, out);
        }
        Node::Element(element) => {
            let tag = element.name();
            if DROPPED_SUBTREES.contains(&tag) {
                return;
            }
            if !ALLOWED_TAGS.contains(&tag) {
                for child in node.children() {
                    write_node(child, out);
                }
                return;
            }

            out.push('<');
            out.push_str(tag);
            for (name, value) in element.attrs() {
                let name = name.to_ascii_lowercase();
                if allowed_attribute(tag, &name, value) {
                    out.push(' ');
                    out.push_str(&name);
                    out.push_str("=\"");
                    html_escape::encode_double_quoted_attribute_to_string(value, out);
                    out.push('"');
                }
            }
            out.push('>');

            if VOID_TAGS.contains(&tag) {
                return;
            }
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        _ => {}
    }
}

/// Reduce a document to allowlisted structural HTML
pub fn sanitize_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    match document.select(&BODY_SELECTOR).next() {
        Some(body) => {
            for child in body.children() {
                write_node(child, &mut out);
            }
        }
        None => write_node(document.tree.root(), &mut out),
    }
    out
}

/// Convert sanitized HTML to Markdown
pub fn to_markdown(clean_html: &str) -> String {
    match htmd::convert(clean_html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            warn!("Markdown conversion failed, falling back to plain text: {}", e);
            Html::parse_fragment(clean_html)
                .root_element()
                .text()
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Sanitize a rendered document and convert it to Markdown
pub fn sanitize(html: &str) -> SanitizedContent {
    let clean = sanitize_html(html);
    let markdown = to_markdown(&clean);
    SanitizedContent {
        html: clean,
        markdown,
    }
}
