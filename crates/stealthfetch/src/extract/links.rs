use super::element_text;
use crate::convert::parse_selector;
use crate::error::FetchError;
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use url::Url;

pub const DEFAULT_LINK_SELECTOR: &str = "a[href]";

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLink {
    pub text: String,
    pub href: String,
    pub absolute_url: String,
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    base.and_then(|base| base.join(href).ok())
        .map(String::from)
        .unwrap_or_else(|| href.to_string())
}

/// Collect links in document order
///
/// `pattern` is a regex searched anywhere in the raw href. At most
/// `max_results` links are returned.
pub fn links(
    html: &str,
    base_url: &str,
    selector: &str,
    pattern: Option<&str>,
    max_results: usize,
) -> Result<Vec<ExtractedLink>, FetchError> {
    let filter = match pattern.filter(|p| !p.is_empty()) {
        Some(p) => Some(Regex::new(p).map_err(|e| FetchError::InvalidPattern(e.to_string()))?),
        None => None,
    };
    let selector = parse_selector(selector)?;
    let base = Url::parse(base_url).ok();
    let document = Html::parse_document(html);

    let mut results = Vec::new();
    for element in document.select(&selector) {
        if results.len() >= max_results {
            break;
        }
        let href = element.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }
        if let Some(filter) = &filter {
            if !filter.is_match(href) {
                continue;
            }
        }
        results.push(ExtractedLink {
            text: element_text(element),
            href: href.to_string(),
            absolute_url: resolve(base.as_ref(), href),
        });
    }

    Ok(results)
}
