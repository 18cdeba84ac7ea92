//! RSS 2.0 and Atom feed parsing
//!
//! Both grammars land in the same [`FeedDocument`] shape; missing elements
//! become empty strings.

use crate::error::FetchError;
use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedDocument {
    pub feed_title: String,
    pub feed_link: String,
    pub items: Vec<FeedItem>,
}

/// Parse a feed, keeping at most `max_items` entries
pub fn feed(xml: &str, max_items: usize) -> Result<FeedDocument, FetchError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)
        .map_err(|e| FetchError::InvalidFeed(e.to_string()))?;
    let root = document.root_element();

    match root.tag_name().name() {
        "rss" => Ok(parse_rss(root, max_items)),
        "feed" => Ok(parse_atom(root, max_items)),
        other => Err(FetchError::UnrecognizedFeed(other.to_string())),
    }
}

/// Child elements with the given local name in the given namespace
fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
    namespace: Option<&'a str>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| {
        child.is_element()
            && child.tag_name().name() == name
            && child.tag_name().namespace() == namespace
    })
}

fn child_text(node: Node<'_, '_>, name: &'static str, namespace: Option<&str>) -> Option<String> {
    children(node, name, namespace)
        .next()
        .map(|child| child.text().unwrap_or("").trim().to_string())
}

fn parse_rss(root: Node<'_, '_>, max_items: usize) -> FeedDocument {
    let Some(channel) = children(root, "channel", None).next() else {
        return FeedDocument::default();
    };

    let items = children(channel, "item", None)
        .take(max_items)
        .map(|item| FeedItem {
            title: child_text(item, "title", None).unwrap_or_default(),
            link: child_text(item, "link", None).unwrap_or_default(),
            published: child_text(item, "pubDate", None).unwrap_or_default(),
            summary: child_text(item, "description", None).unwrap_or_default(),
        })
        .collect();

    FeedDocument {
        feed_title: child_text(channel, "title", None).unwrap_or_default(),
        feed_link: child_text(channel, "link", None).unwrap_or_default(),
        items,
    }
}

fn first_link_href(node: Node<'_, '_>, namespace: Option<&str>) -> String {
    children(node, "link", namespace)
        .next()
        .and_then(|link| link.attribute("href"))
        .unwrap_or("")
        .to_string()
}

fn parse_atom(root: Node<'_, '_>, max_items: usize) -> FeedDocument {
    let ns = root.tag_name().namespace();

    let items = children(root, "entry", ns)
        .take(max_items)
        .map(|entry| FeedItem {
            title: child_text(entry, "title", ns).unwrap_or_default(),
            link: first_link_href(entry, ns),
            published: child_text(entry, "updated", ns)
                .or_else(|| child_text(entry, "published", ns))
                .unwrap_or_default(),
            summary: child_text(entry, "summary", ns)
                .or_else(|| child_text(entry, "content", ns))
                .unwrap_or_default(),
        })
        .collect();

    FeedDocument {
        feed_title: child_text(root, "title", ns).unwrap_or_default(),
        feed_link: first_link_href(root, ns),
        items,
    }
}
