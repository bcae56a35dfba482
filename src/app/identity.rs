use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::app::error::ConfigError;
use crate::app::types::IdentitySelection;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/42.0.2311.135 Safari/537.36";

/// Pre-loaded proxy endpoints and User-Agent strings to draw egress identities from.
#[derive(Debug)]
pub struct IdentityPool {
    proxies: Vec<String>,
    user_agents: Vec<String>,
    rng: fastrand::Rng,
}

impl IdentityPool {
    pub fn new(proxies: Vec<String>, user_agents: Vec<String>) -> Self {
        Self::with_rng(proxies, user_agents, fastrand::Rng::new())
    }

    pub fn with_seed(proxies: Vec<String>, user_agents: Vec<String>, seed: u64) -> Self {
        Self::with_rng(proxies, user_agents, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(proxies: Vec<String>, user_agents: Vec<String>, rng: fastrand::Rng) -> Self {
        Self {
            proxies: clean_entries(proxies),
            user_agents: clean_entries(user_agents),
            rng,
        }
    }

    /// Builds a pool from optional list files. A missing path means an empty list.
    pub fn from_files(
        proxy_list: Option<&Path>,
        user_agent_list: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let proxies = match proxy_list {
            Some(path) => load_list_file(path)?,
            None => Vec::new(),
        };
        let user_agents = match user_agent_list {
            Some(path) => load_list_file(path)?,
            None => Vec::new(),
        };
        debug!(
            proxies = proxies.len(),
            user_agents = user_agents.len(),
            "identity pool loaded"
        );
        Ok(Self::new(proxies, user_agents))
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn user_agent_count(&self) -> usize {
        self.user_agents.len()
    }

    /// Number of distinct identities this pool can hand out.
    pub fn combinations(&self) -> usize {
        self.proxies.len().max(1) * self.user_agents.len().max(1)
    }

    pub fn draw(&mut self) -> IdentitySelection {
        let combos = self.combinations();
        let idx = self.rng.usize(..combos);
        self.selection_at(idx)
    }

    /// Draws a replacement for `previous`, guaranteed to differ from it
    /// whenever the pool holds more than one distinct identity.
    pub fn rotate(&mut self, previous: &IdentitySelection) -> IdentitySelection {
        let combos = self.combinations();
        let Some(prev_idx) = self.index_of(previous) else {
            return self.draw();
        };
        if combos <= 1 {
            return self.selection_at(prev_idx);
        }

        let mut idx = self.rng.usize(..combos - 1);
        if idx >= prev_idx {
            idx += 1;
        }
        self.selection_at(idx)
    }

    fn selection_at(&self, idx: usize) -> IdentitySelection {
        let ua_count = self.user_agents.len().max(1);
        let proxy = self.proxies.get(idx / ua_count).cloned();
        let user_agent = self
            .user_agents
            .get(idx % ua_count)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        IdentitySelection { proxy, user_agent }
    }

    fn index_of(&self, selection: &IdentitySelection) -> Option<usize> {
        let proxy_idx = match &selection.proxy {
            Some(proxy) => self.proxies.iter().position(|p| p == proxy)?,
            None if self.proxies.is_empty() => 0,
            None => return None,
        };
        let ua_idx = if self.user_agents.is_empty() {
            (selection.user_agent == DEFAULT_USER_AGENT).then_some(0)?
        } else {
            self.user_agents
                .iter()
                .position(|ua| *ua == selection.user_agent)?
        };
        Some(proxy_idx * self.user_agents.len().max(1) + ua_idx)
    }
}

/// Reads a one-entry-per-line list. A file that does not exist yields an empty list.
pub fn load_list_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(clean_entries(contents.lines().map(str::to_string).collect())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "list file not found, using defaults");
            Ok(Vec::new())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn clean_entries(entries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}
