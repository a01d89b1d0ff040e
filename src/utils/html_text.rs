//! Visible-text extraction from parsed HTML

use scraper::{ElementRef, Html, Node};

/// Tags whose text never renders
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

fn is_invisible(node: ego_tree::NodeRef<'_, Node>) -> bool {
    node.ancestors().any(|ancestor| {
        ancestor
            .value()
            .as_element()
            .is_some_and(|e| INVISIBLE_TAGS.contains(&e.name()))
    })
}

/// Lower-cased visible text of a parsed document, one space between text nodes
pub fn visible_text_of(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        if let Node::Text(t) = node.value()
            && !is_invisible(node)
        {
            let trimmed = t.trim();
            if !trimmed.is_empty() {
                text.push_str(&trimmed.to_lowercase());
                text.push(' ');
            }
        }
    }
    text
}

/// Lower-cased visible text of an HTML document
pub fn visible_text(html: &str) -> String {
    visible_text_of(&Html::parse_document(html))
}

/// Whitespace-collapsed text content of one element
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_skips_scripts() {
        let html = "<html><head><title>Home</title><style>p{}</style></head>\
                    <body><p>Hello <b>World</b></p><script>var x = 1;</script></body></html>";
        let text = visible_text(html);
        assert!(text.contains("home"));
        assert!(text.contains("hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<div>  Home \n  &gt;   <a>Schools</a> </div>");
        let sel = scraper::Selector::parse("div").unwrap();
        let div = doc.select(&sel).next().unwrap();
        assert_eq!(element_text(&div), "Home > Schools");
    }
}
