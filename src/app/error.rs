use std::path::PathBuf;

use thiserror::Error;

/// A single transport-level failure. Always recoverable by rotating identity.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("gave up on {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("listing has {columns} column rows but {detail_urls} detail URLs")]
    LengthMismatch { columns: usize, detail_urls: usize },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no crawl targets configured")]
    NoTargets,
}
