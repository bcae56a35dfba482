use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::app::extract::{
    DetailExtractor, ListingExtractor, all_elements, element_text, first_attr, first_element,
    normalize_text, selector,
};
use crate::app::types::{ColumnTuple, DetailRecord, Listing};

pub(super) const DEFAULT_TARGETS: &[&str] = &[
    "https://otzovik.com/reviews/ivi_ru-besplatniy_videoservis_s_licenzionnim_polnometrazhnim_kontentom/",
    "https://otzovik.com/reviews/okko_tv-onlayn_kinoteatr/",
    "https://otzovik.com/reviews/megogo_net_onlayn-kinoteatr/",
    "https://otzovik.com/reviews/interaktivnoe_televidenie_wink_russia/",
    "https://otzovik.com/reviews/tvzavr_ru-on-layn_kinoteatr/",
    "https://otzovik.com/reviews/amediateka_ru-onlayn_kinoteatr/",
    "https://otzovik.com/reviews/start-kinoteatr_onlayn/",
    "https://otzovik.com/reviews/usluga_megafon_tv/",
    "https://otzovik.com/reviews/kinotv1_ru-onlayn_kinoteatr/",
    "https://otzovik.com/reviews/vipplay_ru_onlayn_kinoteatr/",
];

/// otzovik.com: listing rows carry author, date, rating and place; the
/// review text lives on a separate page.
#[derive(Debug, Clone, Copy, Default)]
pub struct Otzovik;

impl ListingExtractor for Otzovik {
    fn extract_listing(&self, content: &str) -> Listing {
        let doc = Html::parse_document(content);

        let next_page = Some(first_attr(&doc, "a.pager-item.next", "href"))
            .filter(|href| !href.trim().is_empty());
        let Some(row) = RowSelectors::new() else {
            return Listing {
                next_page,
                ..Listing::default()
            };
        };

        let mut detail_urls = Vec::new();
        let mut columns = Vec::new();
        for link in all_elements(&doc, READ_LINK) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            detail_urls.push(href.to_string());
            columns.push(row.columns(review_scope(link, &row.read_link)));
        }

        Listing {
            next_page,
            detail_urls,
            columns,
        }
    }
}

const READ_LINK: &str = ".review-btn.review-read-link";

/// Column selectors, parsed once per listing page.
struct RowSelectors {
    read_link: Selector,
    login: Selector,
    date: Selector,
    rating: Selector,
    info: Selector,
    div: Selector,
}

impl RowSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            read_link: selector(READ_LINK)?,
            login: selector(".user-login")?,
            date: selector(".review-postdate")?,
            rating: selector(".product-rating.tooltip-right")?,
            info: selector(".user-info")?,
            div: selector("div")?,
        })
    }

    /// Reads one review's columns from inside its own scope, so a missing
    /// element empties that field for this row only.
    fn columns(&self, scope: ElementRef<'_>) -> ColumnTuple {
        let login = scope
            .select(&self.login)
            .next()
            .map(|el| normalize_text(&element_text(el)))
            .unwrap_or_default();
        let date = scope
            .select(&self.date)
            .next()
            .map(|el| normalize_date(&element_text(el)))
            .unwrap_or_default();
        let rate = scope
            .select(&self.rating)
            .next()
            .map(|el| rating_from_title(el.value().attr("title").unwrap_or("")))
            .unwrap_or_default();
        let place = scope
            .select(&self.info)
            .next()
            .and_then(|info| info.select(&self.div).last())
            .map(element_text)
            .unwrap_or_default();
        let (country, city) = split_place(&place);

        ColumnTuple::new()
            .with("login", login)
            .with("date", date)
            .with("rate", rate)
            .with("country", country)
            .with("city", city)
    }
}

/// The widest ancestor of a read link that holds no other review's read link.
fn review_scope<'a>(link: ElementRef<'a>, read_link: &Selector) -> ElementRef<'a> {
    let mut scope = link;
    for ancestor in link.ancestors().filter_map(ElementRef::wrap) {
        if ancestor.select(read_link).nth(1).is_some() {
            break;
        }
        scope = ancestor;
    }
    scope
}

impl DetailExtractor for Otzovik {
    fn extract_detail(&self, content: &str) -> DetailRecord {
        let doc = Html::parse_document(content);
        let text_of = |raw: &str| first_element(&doc, raw).map(element_text).unwrap_or_default();

        let plus = text_of(".review-plus");
        let minus = text_of(".review-minus");
        let summary = text_of(".summary");
        let body = first_element(&doc, ".review-body.description")
            .map(|el| el.text().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        DetailRecord::new()
            .with("content", format!("{summary}\n{plus}\n{minus}\n{body}"))
            .with("plus", plus)
            .with("minus", minus)
            .with("summary", summary)
    }
}

/// `dd.mm.yyyy` becomes `dd-mm-yyyy`; anything unparseable is kept as written.
fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%d.%m.%Y")
        .map(|date| date.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// The rating tooltip reads like "Общий рейтинг: 4"; the score is its last character.
fn rating_from_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .last()
        .map(String::from)
        .unwrap_or_default()
}

fn split_place(place: &str) -> (String, String) {
    let place = place.trim();
    match place.split_once(',') {
        Some((country, city)) => (country.trim().to_string(), city.trim().to_string()),
        None => (place.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="item">
            <a class="user-login" href="/profile/a"> alice </a>
            <div class="user-info"><div>Уровень</div><div>Россия, Москва</div></div>
            <span class="review-postdate">05.03.2021</span>
            <div class="product-rating tooltip-right" title="Общий рейтинг: 4"></div>
            <a class="review-btn review-read-link" href="/review_1.html">read</a>
          </div>
          <div class="item">
            <a class="user-login" href="/profile/b">bob</a>
            <div class="user-info"><div>Беларусь</div></div>
            <span class="review-postdate">garbled</span>
            <div class="product-rating tooltip-right" title="Общий рейтинг: 2"></div>
            <a class="review-btn review-read-link" href="/review_2.html">read</a>
          </div>
          <a class="pager-item next tooltip-top" href="/reviews/x/2/">next</a>
        </body></html>
    "#;

    #[test]
    fn listing_rows_line_up_with_detail_links() {
        let listing = Otzovik.extract_listing(LISTING);

        assert_eq!(listing.next_page.as_deref(), Some("/reviews/x/2/"));
        assert_eq!(listing.detail_urls, ["/review_1.html", "/review_2.html"]);
        assert_eq!(listing.columns.len(), 2);

        let first = &listing.columns[0];
        assert_eq!(first.get("login"), Some("alice"));
        assert_eq!(first.get("date"), Some("05-03-2021"));
        assert_eq!(first.get("rate"), Some("4"));
        assert_eq!(first.get("country"), Some("Россия"));
        assert_eq!(first.get("city"), Some("Москва"));

        let second = &listing.columns[1];
        assert_eq!(second.get("date"), Some("garbled"));
        assert_eq!(second.get("country"), Some("Беларусь"));
        assert_eq!(second.get("city"), Some(""));
    }

    #[test]
    fn last_listing_page_has_no_next_token() {
        let listing = Otzovik.extract_listing("<html><body><p>nothing</p></body></html>");
        assert_eq!(listing.next_page, None);
        assert!(listing.detail_urls.is_empty());
        assert!(listing.columns.is_empty());
    }

    #[test]
    fn missing_rating_stays_in_its_own_row() {
        let listing = Otzovik.extract_listing(
            r#"<html><body>
                <div class="item">
                  <a class="user-login">alice</a>
                  <div class="product-rating tooltip-right" title="Общий рейтинг: 5"></div>
                  <a class="review-btn review-read-link" href="/r1">read</a>
                </div>
                <div class="item">
                  <a class="user-login">bob</a>
                  <a class="review-btn review-read-link" href="/r2">read</a>
                </div>
                <div class="item">
                  <a class="user-login">carol</a>
                  <div class="user-info"><div>Россия, Казань</div></div>
                  <div class="product-rating tooltip-right" title="Общий рейтинг: 1"></div>
                  <a class="review-btn review-read-link" href="/r3">read</a>
                </div>
            </body></html>"#,
        );

        assert_eq!(listing.detail_urls, ["/r1", "/r2", "/r3"]);
        let rates = listing
            .columns
            .iter()
            .map(|row| (row.get("login"), row.get("rate")))
            .collect::<Vec<_>>();
        assert_eq!(
            rates,
            [
                (Some("alice"), Some("5")),
                (Some("bob"), Some("")),
                (Some("carol"), Some("1")),
            ]
        );
        assert_eq!(listing.columns[0].get("city"), Some(""));
        assert_eq!(listing.columns[2].get("city"), Some("Казань"));
    }

    #[test]
    fn detail_page_fields_default_to_empty() {
        let record = Otzovik.extract_detail(
            r#"<html><body>
                <div class="summary">Fine</div>
                <div class="review-plus">fast</div>
            </body></html>"#,
        );

        assert_eq!(record.get("plus"), "fast");
        assert_eq!(record.get("minus"), "");
        assert_eq!(record.get("summary"), "Fine");
        assert_eq!(record.get("content"), "Fine\nfast\n\n");
    }
}
