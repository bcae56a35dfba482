use scraper::{ElementRef, Html, Selector};

use crate::app::types::{DetailRecord, Listing};

/// Reads one listing page.
///
/// Implementations must keep document order and return as many column
/// tuples as detail URLs; the controller refuses to merge a page that does not.
pub trait ListingExtractor {
    fn extract_listing(&self, content: &str) -> Listing;
}

/// Reads one review's detail page. Missing elements become empty fields.
pub trait DetailExtractor {
    fn extract_detail(&self, content: &str) -> DetailRecord;
}

pub(crate) fn selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

pub(crate) fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

pub(crate) fn first_element<'a>(doc: &'a Html, raw: &str) -> Option<ElementRef<'a>> {
    let selector = selector(raw)?;
    doc.select(&selector).next()
}

/// Raw text of the first match, or empty.
pub(crate) fn first_text(doc: &Html, raw: &str) -> String {
    first_element(doc, raw).map(element_text).unwrap_or_default()
}

pub(crate) fn first_attr(doc: &Html, raw: &str, attr: &str) -> String {
    first_element(doc, raw)
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
        .unwrap_or_default()
}

pub(crate) fn all_elements<'a>(doc: &'a Html, raw: &str) -> Vec<ElementRef<'a>> {
    match selector(raw) {
        Some(selector) => doc.select(&selector).collect(),
        None => Vec::new(),
    }
}

pub(crate) fn all_attrs(doc: &Html, raw: &str, attr: &str) -> Vec<String> {
    all_elements(doc, raw)
        .into_iter()
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_return_empty_on_miss() {
        let doc = Html::parse_document("<html><body><p class='x'>hi  there</p></body></html>");

        assert_eq!(normalize_text(&first_text(&doc, ".x")), "hi there");
        assert_eq!(first_text(&doc, ".missing"), "");
        assert_eq!(first_attr(&doc, "meta[itemprop=ratingValue]", "content"), "");
        assert!(all_attrs(&doc, "a", "href").is_empty());
    }
}
