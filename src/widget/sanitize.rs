//! Allow-list sanitiser for HTML fragments returned by the chat backend.
//!
//! Replies are rendered as markup inside the widget, so they are rebuilt from
//! a parsed tree: known formatting tags survive with a small set of
//! attributes, active content is dropped together with its children, and any
//! other tag is unwrapped to its text.

use scraper::{ElementRef, Html, Node};

use crate::html::escape;

/// Tags kept as-is.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "img", "li", "mark", "ol", "p", "pre", "s", "small", "span", "strong", "sub", "sup",
    "table", "tbody", "td", "th", "thead", "tr", "u", "ul",
];

/// Tags removed along with everything inside them.
const DROPPED_TAGS: &[&str] = &[
    "button", "embed", "form", "iframe", "input", "math", "noscript", "object", "script", "select",
    "style", "svg", "template", "textarea",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// Sanitise an untrusted HTML fragment.
#[must_use]
pub fn sanitize_fragment(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::with_capacity(input.len());
    write_children(fragment.root_element(), &mut out);
    out
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    if DROPPED_TAGS.contains(&name) {
        return;
    }
    if !ALLOWED_TAGS.contains(&name) {
        write_children(element, out);
        return;
    }

    out.push('<');
    out.push_str(name);
    let mut opens_new_tab = false;
    for (attr, value) in element.value().attrs() {
        if !attribute_allowed(name, attr, value) {
            continue;
        }
        if attr == "target" {
            opens_new_tab = true;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    if opens_new_tab {
        out.push_str(" rel=\"noopener noreferrer\"");
    }
    out.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }

    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn attribute_allowed(tag: &str, attr: &str, value: &str) -> bool {
    match (tag, attr) {
        (_, "class" | "title") => true,
        ("a", "href") => safe_url(value, true),
        ("a", "target") => value == "_blank",
        ("img", "src") => safe_url(value, false),
        ("img", "alt" | "width" | "height") => true,
        ("td" | "th", "colspan" | "rowspan") => value.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn safe_url(value: &str, allow_links: bool) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        return true;
    }
    allow_links
        && (lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with('#')
            || (lower.starts_with('/') && !lower.starts_with("//")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_formatting() {
        assert_eq!(sanitize_fragment("<p>Hi there</p>"), "<p>Hi there</p>");
        assert_eq!(
            sanitize_fragment("<ul><li><strong>One</strong></li><li>Two</li></ul>"),
            "<ul><li><strong>One</strong></li><li>Two</li></ul>"
        );
    }

    #[test]
    fn test_drops_scripts_and_handlers() {
        let dirty = r#"<p onclick="steal()">Hello<script>alert(1)</script></p><img src="x" onerror="boom()">"#;
        assert_eq!(sanitize_fragment(dirty), "<p>Hello</p><img>");
    }

    #[test]
    fn test_rejects_javascript_links() {
        let dirty = r#"<a href="javascript:alert(1)">click</a>"#;
        assert_eq!(sanitize_fragment(dirty), "<a>click</a>");
    }

    #[test]
    fn test_new_tab_links_get_rel() {
        let html = r#"<a href="https://example.com" target="_blank">site</a>"#;
        assert_eq!(
            sanitize_fragment(html),
            r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer">site</a>"#
        );
    }

    #[test]
    fn test_unwraps_unknown_tags_and_escapes_text() {
        assert_eq!(
            sanitize_fragment("<custom-card>1 &lt; 2</custom-card>"),
            "1 &lt; 2"
        );
    }
}
