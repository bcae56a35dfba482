mod align;
mod config;
mod crawl;
mod data_io;
mod error;
mod extract;
mod fetch;
mod identity;
mod runtime;
pub mod sites;
mod types;

pub use align::{check_alignment, merge_row};
pub use config::{CrawlConfig, RetryConfig, Target, TargetConfig};
pub use crawl::{CrawlOptions, Crawler};
pub use data_io::{
    OUTPUT_EXTENSION, OutputHandle, RecordSink, claim_output_version, target_name_from_url,
};
pub use error::{AlignmentError, ConfigError, CrawlError, FetchError, SinkError, TransportError};
pub use extract::{DetailExtractor, ListingExtractor};
pub use fetch::{DEFAULT_TIMEOUT, FetchClient, HttpTransport, RetryPolicy, Transport};
pub use identity::{DEFAULT_USER_AGENT, IdentityPool, load_list_file};
pub use runtime::{crawl_target, run, run_with_config};
pub use sites::Site;
pub use types::{
    Cli, ColumnTuple, CrawlState, CrawlSummary, DetailRecord, FetchAttempt, IdentitySelection,
    Listing, MergedRecord,
};
