use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::app::error::{FetchError, TransportError};
use crate::app::identity::IdentityPool;
use crate::app::types::{CrawlState, FetchAttempt, IdentitySelection};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// One HTTP GET under a given identity.
///
/// `Ok(None)` is a soft failure: the origin answered with a non-success status.
#[async_trait]
pub trait Transport {
    async fn get(&self, attempt: &FetchAttempt) -> Result<Option<String>, TransportError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` keeps retrying forever.
    pub max_attempts: Option<u32>,
    pub warn_after: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(30),
            warn_after: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Default::default()
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(16) as i32;
        let raw = self.base_delay.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = raw.min(self.max_delay.as_millis() as f64);
        let scaled = if self.jitter {
            capped * (0.5 + fastrand::f64())
        } else {
            capped
        };
        Duration::from_millis(scaled as u64)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Fetches page text, rotating egress identity on every failure.
pub struct FetchClient<T> {
    transport: T,
    pool: IdentityPool,
    policy: RetryPolicy,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, pool: IdentityPool, policy: RetryPolicy) -> Self {
        Self {
            transport,
            pool,
            policy,
        }
    }

    pub fn draw_identity(&mut self) -> IdentitySelection {
        self.pool.draw()
    }

    /// Replaces the state's identity wholesale with a fresh one. An identity
    /// that has not carried a request yet is already fresh and is kept, so
    /// back-to-back rotations cannot land on the identity last used.
    pub fn rotate(&mut self, state: &mut CrawlState) {
        if !state.identity_spent {
            return;
        }
        state.identity = self.pool.rotate(&state.identity);
        state.identity_spent = false;
        debug!(identity = %state.identity.label(), "rotated identity");
    }

    /// Returns non-empty content for `url`, or `Exhausted` once the policy's
    /// attempt ceiling is reached. With an unbounded policy this only returns
    /// on success.
    pub async fn fetch(&mut self, url: &str, state: &mut CrawlState) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            let request = FetchAttempt {
                url: url.to_string(),
                identity: state.identity.clone(),
                attempt,
            };
            info!(url, identity = %request.identity.label(), attempt, "requesting");
            state.identity_spent = true;

            match self.transport.get(&request).await {
                Ok(Some(body)) if !body.trim().is_empty() => {
                    state.consecutive_failures = 0;
                    return Ok(body);
                }
                Ok(Some(_)) => warn!(url, "empty response body"),
                Ok(None) => warn!(url, "non-success status"),
                Err(err) => warn!(url, error = %err, "request failed"),
            }

            attempt += 1;
            state.consecutive_failures += 1;
            if attempt > self.policy.warn_after {
                warn!(url, attempts = attempt, "reconnect counter is more than {}", self.policy.warn_after);
            }
            if self.policy.exhausted(attempt) {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                });
            }

            self.rotate(state);
            warn!(identity = %state.identity.label(), "retrying with new identity");
            let delay = self.policy.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// reqwest-backed transport. Proxies are client-level in reqwest, so the
/// client is rebuilt whenever the identity changes.
pub struct HttpTransport {
    timeout: Duration,
    cached: Mutex<Option<(IdentitySelection, reqwest::Client)>>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cached: Mutex::new(None),
        }
    }

    fn client_for(&self, identity: &IdentitySelection) -> Result<reqwest::Client, TransportError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| TransportError::Other("client cache poisoned".to_string()))?;
        if let Some((cached_identity, client)) = cached.as_ref() {
            if cached_identity == identity {
                return Ok(client.clone());
            }
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(identity.user_agent.as_str())
            .connect_timeout(self.timeout)
            .timeout(self.timeout);
        if let Some(proxy) = &identity.proxy {
            let endpoint = normalize_proxy(proxy);
            let proxy = reqwest::Proxy::all(&endpoint).map_err(|err| TransportError::InvalidProxy {
                proxy: endpoint.clone(),
                reason: err.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build()?;
        *cached = Some((identity.clone(), client.clone()));
        Ok(client)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, attempt: &FetchAttempt) -> Result<Option<String>, TransportError> {
        let client = self.client_for(&attempt.identity)?;
        let response = client.get(&attempt.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(url = %attempt.url, status = status.as_u16(), "non-success status");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}

fn normalize_proxy(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
