use super::element_text;
use crate::convert::parse_selector;
use crate::error::FetchError;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// A table reduced to header and body cell text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn children_named<'a>(
    element: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

fn cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
        .map(element_text)
        .collect()
}

fn has_th(row: ElementRef<'_>) -> bool {
    children_named(row, "th").next().is_some()
}

/// Rows that belong to this table and not to a nested one
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(children_named(child, "tr")),
            _ => {}
        }
    }
    rows
}

fn header_row(table: ElementRef<'_>) -> Vec<String> {
    if let Some(head) = children_named(table, "thead").next() {
        if let Some(row) = children_named(head, "tr").next() {
            return cells(row);
        }
    }
    match own_rows(table).first() {
        Some(first) if has_th(*first) => cells(*first),
        _ => Vec::new(),
    }
}

fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let sections: Vec<ElementRef<'_>> = children_named(table, "tbody").collect();
    if sections.is_empty() {
        children_named(table, "tr").collect()
    } else {
        sections
            .into_iter()
            .flat_map(|section| children_named(section, "tr"))
            .collect()
    }
}

fn extract_table(table: ElementRef<'_>) -> ExtractedTable {
    let headers = header_row(table);
    let mut rows: Vec<Vec<String>> = body_rows(table)
        .into_iter()
        .map(cells)
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    // The header row can show up again in the body scan
    if !headers.is_empty() && rows.first() == Some(&headers) {
        rows.remove(0);
    }

    ExtractedTable { headers, rows }
}

/// Extract every table under the selected root, in document order
pub fn tables(html: &str, selector: Option<&str>) -> Result<Vec<ExtractedTable>, FetchError> {
    let document = Html::parse_document(html);
    let selected = match selector {
        Some(selector) => document.select(&parse_selector(selector)?).next(),
        None => None,
    };
    let root = selected.unwrap_or_else(|| document.root_element());

    if root.value().name() == "table" {
        return Ok(vec![extract_table(root)]);
    }

    Ok(root
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "table")
        .map(extract_table)
        .collect())
}
