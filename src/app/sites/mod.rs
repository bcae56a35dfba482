//! Review sites with known markup.

mod irecommend;
mod otzovik;

use clap::ValueEnum;
use serde::Deserialize;

use crate::app::extract::{DetailExtractor, ListingExtractor};
use crate::app::types::{DetailRecord, Listing};

pub use irecommend::Irecommend;
pub use otzovik::Otzovik;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Otzovik,
    Irecommend,
}

impl Site {
    /// Value written to the `source` column.
    pub fn tag(self) -> &'static str {
        match self {
            Site::Otzovik => "otzovik",
            Site::Irecommend => "irecommend",
        }
    }

    /// CSV column order for this site's output files.
    pub fn fields(self) -> Vec<String> {
        let fields: &[&str] = match self {
            Site::Otzovik => &[
                "login",
                "date",
                "content",
                "rate",
                "country",
                "city",
                "plus",
                "minus",
                "summary",
                "source",
                "collected_at",
            ],
            Site::Irecommend => &[
                "author",
                "date",
                "rate",
                "title",
                "content",
                "source",
                "collected_at",
            ],
        };
        fields.iter().map(|f| f.to_string()).collect()
    }

    pub fn default_targets(self) -> &'static [&'static str] {
        match self {
            Site::Otzovik => otzovik::DEFAULT_TARGETS,
            Site::Irecommend => irecommend::DEFAULT_TARGETS,
        }
    }

    /// Guesses the site from a listing URL's host.
    pub fn from_url(url: &str) -> Option<Site> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        if host.ends_with("otzovik.com") {
            Some(Site::Otzovik)
        } else if host.ends_with("irecommend.ru") {
            Some(Site::Irecommend)
        } else {
            None
        }
    }
}

impl ListingExtractor for Site {
    fn extract_listing(&self, content: &str) -> Listing {
        match self {
            Site::Otzovik => Otzovik.extract_listing(content),
            Site::Irecommend => Irecommend.extract_listing(content),
        }
    }
}

impl DetailExtractor for Site {
    fn extract_detail(&self, content: &str) -> DetailRecord {
        match self {
            Site::Otzovik => Otzovik.extract_detail(content),
            Site::Irecommend => Irecommend.extract_detail(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_is_detected_from_host() {
        assert_eq!(
            Site::from_url("https://otzovik.com/reviews/okko_tv-onlayn_kinoteatr/"),
            Some(Site::Otzovik)
        );
        assert_eq!(
            Site::from_url("https://irecommend.ru/content/tvzavrru"),
            Some(Site::Irecommend)
        );
        assert_eq!(Site::from_url("https://example.com/"), None);
    }

    #[test]
    fn every_site_tags_its_rows() {
        for site in [Site::Otzovik, Site::Irecommend] {
            let fields = site.fields();
            assert!(fields.iter().any(|f| f == "source"));
            assert!(fields.iter().any(|f| f == "collected_at"));
            assert!(!site.default_targets().is_empty());
        }
    }
}
