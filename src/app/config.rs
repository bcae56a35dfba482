use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::app::crawl::CrawlOptions;
use crate::app::data_io::target_name_from_url;
use crate::app::error::ConfigError;
use crate::app::fetch::{DEFAULT_TIMEOUT, RetryPolicy};
use crate::app::sites::Site;
use crate::app::types::Cli;

/// Static crawl configuration, optionally loaded from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub site: Option<Site>,
    pub targets: Vec<TargetConfig>,
    pub output_dir: PathBuf,
    pub proxy_list: Option<PathBuf>,
    pub user_agent_list: Option<PathBuf>,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
    pub max_pages: Option<usize>,
    pub checkpoint_every: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<Site>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// `null` retries forever.
    pub max_attempts: Option<u32>,
    pub warn_after: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// A target with everything resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub name: String,
    pub site: Site,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site: None,
            targets: Vec::new(),
            output_dir: PathBuf::from("results"),
            proxy_list: None,
            user_agent_list: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            retry: RetryConfig::default(),
            max_pages: None,
            checkpoint_every: 25,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            warn_after: policy.warn_after,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// File config (or defaults) with command-line values layered on top.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.site.is_some() {
            self.site = cli.site;
        }
        if !cli.urls.is_empty() {
            self.targets = cli
                .urls
                .iter()
                .map(|url| TargetConfig {
                    url: url.clone(),
                    name: None,
                    site: None,
                })
                .collect();
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(path) = &cli.proxies {
            self.proxy_list = Some(path.clone());
        }
        if let Some(path) = &cli.user_agents {
            self.user_agent_list = Some(path.clone());
        }
        if let Some(secs) = cli.timeout_secs {
            self.timeout_secs = secs;
        }
        if cli.retry_forever {
            self.retry.max_attempts = None;
        } else if let Some(max) = cli.max_attempts {
            self.retry.max_attempts = Some(max);
        }
        if cli.max_pages.is_some() {
            self.max_pages = cli.max_pages;
        }
        if let Some(every) = cli.checkpoint_every {
            self.checkpoint_every = every;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.map(|max| max.max(1)),
            warn_after: self.retry.warn_after,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            max_pages: self.max_pages,
            checkpoint_every: self.checkpoint_every,
        }
    }

    /// Explicit targets, or the chosen site's built-in list. Each target's
    /// site comes from the target itself, then its host, then the global site.
    pub fn resolve_targets(&self) -> Result<Vec<Target>, ConfigError> {
        let targets = if self.targets.is_empty() {
            self.site
                .map(|site| {
                    site.default_targets()
                        .iter()
                        .map(|url| TargetConfig {
                            url: url.to_string(),
                            name: None,
                            site: Some(site),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        } else {
            self.targets.clone()
        };

        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            let Some(site) = target
                .site
                .or_else(|| Site::from_url(&target.url))
                .or(self.site)
            else {
                tracing::warn!(url = %target.url, "no site profile for target, skipping");
                continue;
            };
            let name = target
                .name
                .clone()
                .unwrap_or_else(|| target_name_from_url(&target.url));
            resolved.push(Target {
                url: target.url,
                name,
                site,
            });
        }

        if resolved.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        Ok(resolved)
    }
}
