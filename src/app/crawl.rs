use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::align::{check_alignment, merge_row};
use crate::app::data_io::OutputHandle;
use crate::app::error::CrawlError;
use crate::app::extract::{DetailExtractor, ListingExtractor};
use crate::app::fetch::{FetchClient, Transport};
use crate::app::types::{CrawlState, CrawlSummary, DetailRecord, Listing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Stop after this many listing pages. `None` follows the chain to its end.
    pub max_pages: Option<usize>,
    /// Log a progress checkpoint every this many pages; 0 disables it.
    pub checkpoint_every: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            checkpoint_every: 25,
        }
    }
}

/// Walks a listing's pagination chain, one request at a time.
pub struct Crawler<T> {
    fetch: FetchClient<T>,
    options: CrawlOptions,
}

impl<T: Transport> Crawler<T> {
    pub fn new(fetch: FetchClient<T>, options: CrawlOptions) -> Self {
        Self { fetch, options }
    }

    /// Crawls every listing page reachable from `start_url`, appending merged
    /// rows to `output` in document order.
    ///
    /// A page whose column rows and detail links disagree in count is logged
    /// and skipped; its next-page link is still followed.
    pub async fn crawl<E>(
        &mut self,
        start_url: &str,
        extractor: &E,
        source: &str,
        output: &mut OutputHandle,
    ) -> Result<CrawlSummary, CrawlError>
    where
        E: ListingExtractor + DetailExtractor,
    {
        Url::parse(start_url)?;
        let identity = self.fetch.draw_identity();
        let mut state = CrawlState::new(start_url, identity);
        let mut summary = CrawlSummary::default();

        loop {
            let page_url = state.page_url.clone();
            let content = self.fetch.fetch(&page_url, &mut state).await?;
            state.page_index += 1;
            summary.pages += 1;
            info!(page = state.page_index, url = %page_url, "connected to listing page");

            let mut listing = extractor.extract_listing(&content);
            let next_page = listing.next_page.take();

            match check_alignment(&listing) {
                Ok(()) => {
                    self.fetch.rotate(&mut state);
                    let written = self
                        .crawl_details(&page_url, &listing, extractor, source, output, &mut state)
                        .await?;
                    summary.records += written;
                    info!(url = %page_url, reviews = written, "all reviews on page done");
                }
                Err(err) => {
                    error!(url = %page_url, error = %err, "skipping misaligned listing page");
                    summary.skipped_pages += 1;
                }
            }

            let Some(token) = next_page else {
                info!(pages = summary.pages, records = summary.records, "last page done");
                break;
            };
            if self.options.max_pages.is_some_and(|max| summary.pages >= max) {
                warn!(pages = summary.pages, next = %token, "page limit reached, stopping");
                break;
            }
            if self.options.checkpoint_every > 0 && summary.pages % self.options.checkpoint_every == 0 {
                info!(
                    pages = summary.pages,
                    records = summary.records,
                    output = %output.path().display(),
                    "checkpoint"
                );
            }

            state.page_url = Url::parse(&page_url)?.join(token.trim())?.to_string();
            self.fetch.rotate(&mut state);
        }

        Ok(summary)
    }

    async fn crawl_details<E>(
        &mut self,
        page_url: &str,
        listing: &Listing,
        extractor: &E,
        source: &str,
        output: &mut OutputHandle,
        state: &mut CrawlState,
    ) -> Result<usize, CrawlError>
    where
        E: DetailExtractor,
    {
        let base = Url::parse(page_url)?;
        let mut written = 0;

        for (idx, (column, href)) in listing.columns.iter().zip(&listing.detail_urls).enumerate() {
            let detail = match base.join(href.trim()) {
                Ok(detail_url) => {
                    self.fetch.rotate(state);
                    match self.fetch.fetch(detail_url.as_str(), state).await {
                        Ok(content) => {
                            debug!(idx, url = %detail_url, "request passed");
                            extractor.extract_detail(&content)
                        }
                        Err(err) => {
                            warn!(idx, error = %err, "keeping listing fields without review body");
                            DetailRecord::new()
                        }
                    }
                }
                Err(err) => {
                    warn!(idx, href = %href, error = %err, "unusable review link");
                    DetailRecord::new()
                }
            };

            let record = merge_row(column, &detail, source, &collected_at());
            output.append(&record)?;
            written += 1;
        }

        Ok(written)
    }
}

fn collected_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
