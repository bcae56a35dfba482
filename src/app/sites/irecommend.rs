use scraper::Html;

use crate::app::extract::{
    DetailExtractor, ListingExtractor, all_attrs, element_text, first_attr, first_element,
    first_text,
};
use crate::app::types::{ColumnTuple, DetailRecord, Listing};

pub(super) const DEFAULT_TARGETS: &[&str] = &[
    "https://irecommend.ru/content/sait-megogonet",
    "https://irecommend.ru/content/tvzavrru",
    "https://irecommend.ru/content/amediateka-amediateka",
];

/// irecommend.ru: the listing only links to reviews, every field comes from
/// the review page. Listings are read as a single page.
#[derive(Debug, Clone, Copy, Default)]
pub struct Irecommend;

impl ListingExtractor for Irecommend {
    fn extract_listing(&self, content: &str) -> Listing {
        let doc = Html::parse_document(content);
        let detail_urls = all_attrs(&doc, ".more", "href");
        let columns = vec![ColumnTuple::new(); detail_urls.len()];

        Listing {
            next_page: None,
            detail_urls,
            columns,
        }
    }
}

impl DetailExtractor for Irecommend {
    fn extract_detail(&self, content: &str) -> DetailRecord {
        let doc = Html::parse_document(content);

        let author = first_text(&doc, "div[itemprop=author]").trim().to_string();
        let rate = first_attr(&doc, "meta[itemprop=ratingValue]", "content");
        let date = first_attr(&doc, "meta[itemprop=datePublished]", "content");
        let title = first_text(&doc, ".reviewTitle");
        let body = first_element(&doc, "div[itemprop=reviewBody]")
            .map(element_text)
            .unwrap_or_default();

        DetailRecord::new()
            .with("author", author)
            .with("rate", rate)
            .with("date", date_only(&date))
            .with("content", format!("{title}\n{body}"))
            .with("title", title)
    }
}

/// Drops the time part of an ISO-8601 timestamp.
fn date_only(raw: &str) -> String {
    raw.split('T').next().unwrap_or_default().trim().to_string()
}
