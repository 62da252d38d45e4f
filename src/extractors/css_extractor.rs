//! CSS selector helpers
//!
//! Thin wrappers over the scraper crate that scope selection to an element
//! and report bad selectors as errors instead of empty results.

use scraper::{ElementRef, Selector};

use crate::error::{Error, Result};

/// Compile a CSS selector.
pub fn parse_selector(selector_str: &str) -> Result<Selector> {
    Selector::parse(selector_str).map_err(|e| Error::Selector {
        selector: selector_str.to_string(),
        reason: format!("{e:?}"),
    })
}

/// First descendant of `scope` matching the selector.
pub fn select_first<'a>(scope: ElementRef<'a>, selector_str: &str) -> Result<Option<ElementRef<'a>>> {
    let selector = parse_selector(selector_str)?;
    Ok(scope.select(&selector).next())
}

/// All descendants of `scope` matching the selector, in document order.
pub fn select_all<'a>(scope: ElementRef<'a>, selector_str: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = parse_selector(selector_str)?;
    Ok(scope.select(&selector).collect())
}

/// Concatenated text content of an element, trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the element's first child when that child is a text node.
pub fn leading_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .next()
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
}

/// Child elements only, skipping text and comment nodes.
pub fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}
