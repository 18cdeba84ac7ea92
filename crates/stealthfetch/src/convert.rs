//! HTML to readable text reduction

use crate::error::FetchError;
use crate::truncate::truncate;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements dropped before rendering, together with everything inside them
pub(crate) const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "form", "svg", "iframe",
];

const BLOCK_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "div"];

/// Collapse whitespace runs to single spaces and trim
pub(crate) fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn is_noise(name: &str) -> bool {
    NOISE_TAGS.contains(&name)
}

/// True when the element sits in (or is) a removed noise subtree
fn in_noise(element: ElementRef<'_>) -> bool {
    is_noise(element.value().name())
        || element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(|el| is_noise(el.name()))
}

fn has_block_child(element: ElementRef<'_>) -> bool {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| BLOCK_TAGS.contains(&child.value().name()))
}

fn body_or_root(html: &Html) -> ElementRef<'_> {
    let root = html.root_element();
    root.children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root)
}

fn inline_text(element: ElementRef<'_>) -> String {
    let name = element.value().name();
    if is_noise(name) {
        return String::new();
    }
    let parts: Vec<String> = element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(normalize_whitespace(text)),
            Node::Element(_) => ElementRef::wrap(child).map(inline_text),
            _ => None,
        })
        .filter(|part| !part.is_empty())
        .collect();
    let text = normalize_whitespace(&parts.join(" "));
    if name != "a" {
        return text;
    }
    let href = element.value().attr("href").unwrap_or("").trim();
    match (href.is_empty(), text.is_empty()) {
        (true, _) => text,
        (false, true) => format!("[{href}]({href})"),
        (false, false) => format!("[{text}]({href})"),
    }
}

fn render_block(element: ElementRef<'_>) -> Option<String> {
    let name = element.value().name();
    if name == "div" && has_block_child(element) {
        return None;
    }
    let text = inline_text(element);
    if text.is_empty() {
        return None;
    }
    let line = match name.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => {
            let level = usize::from(level - b'0');
            format!("{} {}", "#".repeat(level), text)
        }
        b"li" => format!("- {text}"),
        _ => text,
    };
    Some(line)
}

fn collect_blocks(parent: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in parent.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        if is_noise(name) {
            continue;
        }
        if BLOCK_TAGS.contains(&name) {
            if let Some(line) = render_block(child) {
                lines.push(line);
            }
        }
        collect_blocks(child, lines);
    }
}

/// Reduce an HTML document to markdown-flavoured text
///
/// Headings become `#` lines, list items `- ` lines, paragraphs and leaf
/// divs bare lines. Anchors render inline as `[text](href)`. When `selector`
/// matches nothing the whole body is rendered under a
/// `[selector not found: ...]` line.
pub fn reduce(html: &str, selector: Option<&str>, max_chars: usize) -> Result<String, FetchError> {
    let document = Html::parse_document(html);

    let mut prefix = String::new();
    let mut root = body_or_root(&document);
    if let Some(selector) = selector {
        let parsed = parse_selector(selector)?;
        match document.select(&parsed).find(|el| !in_noise(*el)) {
            Some(found) => root = found,
            None => prefix = format!("[selector not found: {selector}]\n\n"),
        }
    }

    let mut lines = Vec::new();
    collect_blocks(root, &mut lines);

    let rendered = format!("{}{}", prefix, lines.join("\n"));
    Ok(truncate(rendered.trim(), max_chars))
}
