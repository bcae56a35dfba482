use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use crate::app::sites::Site;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "revcrawl",
    version,
    about = "Review crawler with proxy/user-agent failover and versioned CSV output"
)]
pub struct Cli {
    /// Listing URLs to crawl. Falls back to the config file, then to the site's built-in targets.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    #[arg(long, value_enum)]
    pub site: Option<Site>,

    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub proxies: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub user_agents: Option<PathBuf>,

    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_name = "N", conflicts_with = "retry_forever")]
    pub max_attempts: Option<u32>,

    #[arg(long, default_value_t = false)]
    pub retry_forever: bool,

    #[arg(long, value_name = "N")]
    pub max_pages: Option<usize>,

    #[arg(long, value_name = "N")]
    pub checkpoint_every: Option<usize>,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Egress identity presented to the origin: optional proxy plus User-Agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentitySelection {
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl IdentitySelection {
    pub fn label(&self) -> String {
        match &self.proxy {
            Some(proxy) => format!("proxy={proxy}"),
            None => "proxy=none".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub url: String,
    pub identity: IdentitySelection,
    pub attempt: u32,
}

/// Traversal state for one crawl target. Only the controller and the fetch client touch it.
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub page_url: String,
    pub page_index: usize,
    pub identity: IdentitySelection,
    pub consecutive_failures: u32,
    /// Set once `identity` has carried a request; cleared by rotation.
    pub identity_spent: bool,
}

impl CrawlState {
    pub fn new(start_url: impl Into<String>, identity: IdentitySelection) -> Self {
        Self {
            page_url: start_url.into(),
            page_index: 0,
            identity,
            consecutive_failures: 0,
            identity_spent: false,
        }
    }
}

/// Scalar fields scraped from one listing row, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTuple {
    fields: Vec<(String, String)>,
}

impl ColumnTuple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRecord {
    fields: BTreeMap<String, String>,
}

impl DetailRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Absent fields read as empty.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Listing-row fields, detail-page fields and derived fields for one review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRecord {
    fields: BTreeMap<String, String>,
}

impl MergedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Values in the given field order; missing fields render empty.
    pub fn values_for<'a>(&'a self, fields: &'a [String]) -> impl Iterator<Item = &'a str> {
        fields
            .iter()
            .map(|field| self.get(field).unwrap_or(""))
    }
}

impl<K, V> FromIterator<(K, V)> for MergedRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = MergedRecord::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

/// What a listing extractor finds on one list page.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub next_page: Option<String>,
    pub detail_urls: Vec<String>,
    pub columns: Vec<ColumnTuple>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: usize,
    pub records: usize,
    pub skipped_pages: usize,
}
