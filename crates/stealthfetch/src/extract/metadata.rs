use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Page-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageMetadata {
    /// Every JSON-LD block that parsed
    pub json_ld: Vec<Value>,
    /// `og:*` properties keyed without the prefix
    pub opengraph: BTreeMap<String, String>,
    /// `twitter:*` names keyed without the prefix
    pub twitter: BTreeMap<String, String>,
    /// Remaining `<meta>` name/http-equiv pairs
    pub meta: BTreeMap<String, String>,
}

/// Collect JSON-LD, OpenGraph, Twitter card and generic meta values
pub fn metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut out = PageMetadata::default();

    if let Ok(sel) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        for script in document.select(&sel) {
            let raw: String = script.text().collect();
            if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
                out.json_ld.push(value);
            }
        }
    }

    if let Ok(sel) = Selector::parse("meta") {
        for meta in document.select(&sel) {
            let el = meta.value();
            let content = el.attr("content");

            if let Some(key) = el.attr("property").and_then(|p| p.strip_prefix("og:")) {
                out.opengraph
                    .insert(key.to_string(), content.unwrap_or("").to_string());
            }

            let name = el.attr("name");
            if let Some(key) = name.and_then(|n| n.strip_prefix("twitter:")) {
                out.twitter
                    .insert(key.to_string(), content.unwrap_or("").to_string());
            }

            let generic_key = name.or_else(|| el.attr("http-equiv"));
            if let (Some(key), Some(content)) = (generic_key, content) {
                if !key.starts_with("og:") && !key.starts_with("twitter:") {
                    out.meta.insert(key.to_string(), content.to_string());
                }
            }
        }
    }

    out
}
