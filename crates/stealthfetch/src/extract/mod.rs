//! Structured extraction from HTML pages
//!
//! Extractors never fail on malformed markup: fragments they cannot use are
//! skipped. Only caller-supplied selectors and patterns can produce errors.

mod links;
mod metadata;
mod tables;

pub use links::{links, ExtractedLink, DEFAULT_LINK_SELECTOR};
pub use metadata::{metadata, PageMetadata};
pub use tables::{tables, ExtractedTable};

use crate::convert::normalize_whitespace;
use scraper::ElementRef;

/// Visible text of an element, pieces joined by spaces and normalised
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let pieces: Vec<&str> = element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect();
    normalize_whitespace(&pieces.join(" "))
}
