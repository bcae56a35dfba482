use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::config::{CrawlConfig, Target};
use crate::app::crawl::Crawler;
use crate::app::data_io::RecordSink;
use crate::app::error::CrawlError;
use crate::app::fetch::{FetchClient, HttpTransport, Transport};
use crate::app::identity::IdentityPool;
use crate::app::types::{Cli, CrawlSummary};

/// Entry point for the binary. Returns `Ok(false)` when any target failed.
pub async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = CrawlConfig::from_cli(&cli)?;
    run_with_config(&config).await
}

pub async fn run_with_config(config: &CrawlConfig) -> anyhow::Result<bool> {
    let targets = config.resolve_targets()?;
    let pool = IdentityPool::from_files(
        config.proxy_list.as_deref(),
        config.user_agent_list.as_deref(),
    )?;
    info!(
        targets = targets.len(),
        proxies = pool.proxy_count(),
        user_agents = pool.user_agent_count(),
        output = %config.output_dir.display(),
        "starting crawl"
    );

    let fetch = FetchClient::new(
        HttpTransport::new(config.timeout()),
        pool,
        config.retry_policy(),
    );
    let mut crawler = Crawler::new(fetch, config.crawl_options());

    let mut all_ok = true;
    for target in &targets {
        let sink = RecordSink::new(config.output_dir.join(target.site.tag()), target.site.fields());
        match crawl_target(&mut crawler, &sink, target).await {
            Ok(summary) => info!(
                target = %target.name,
                pages = summary.pages,
                records = summary.records,
                skipped_pages = summary.skipped_pages,
                "target finished"
            ),
            Err(err) => {
                error!(target = %target.name, url = %target.url, error = %err, "target aborted");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

pub async fn crawl_target<T: Transport>(
    crawler: &mut Crawler<T>,
    sink: &RecordSink,
    target: &Target,
) -> Result<CrawlSummary, CrawlError> {
    let mut output = sink.open(&target.name)?;
    crawler
        .crawl(&target.url, &target.site, target.site.tag(), &mut output)
        .await
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
