//! Client and job cache configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default v2 API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.acculynx.com/api/v2";

/// Default per-request timeout applied by the HTTP transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Jobs requested per page during a cache refresh.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Pages requested concurrently per refresh batch.
pub const DEFAULT_BATCH_SIZE: u32 = 25;

/// Ceiling on outstanding page fetches across the whole cache.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 25;

/// Interval between background refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

pub const ENV_API_KEY: &str = "ACCULYNX_API_KEY";
pub const ENV_BASE_URL: &str = "ACCULYNX_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "ACCULYNX_TIMEOUT_SECS";
pub const ENV_CACHE_REFRESH_SECS: &str = "ACCULYNX_CACHE_REFRESH_SECS";
pub const ENV_CACHE_BATCH_PAUSE_MS: &str = "ACCULYNX_CACHE_BATCH_PAUSE_MS";

/// Configuration for [`AccuLynxClient`](crate::client::AccuLynxClient).
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("acculynx-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// - `ACCULYNX_API_KEY` (required)
    /// - `ACCULYNX_BASE_URL` (optional, defaults to the v2 production API)
    /// - `ACCULYNX_TIMEOUT_SECS` (optional, defaults to 30)
    ///
    /// # Errors
    /// Returns `Error::Config` if the key is missing or a value is malformed.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = ClientConfig::new(api_key);
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config = config.with_base_url(url);
        }
        if let Some(secs) = parse_env_u64(ENV_TIMEOUT_SECS)? {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Trailing slashes are stripped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Base URL of the v1 API, used by endpoints not yet ported to v2.
    pub fn v1_base_url(&self) -> String {
        self.base_url.replace("/api/v2", "/api/v1")
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api key must not be empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base url must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Tuning for [`JobCache`](crate::cache::JobCache) refreshes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub page_size: u32,
    pub batch_size: u32,
    pub max_in_flight: usize,
    pub refresh_interval: Duration,
    /// Fixed pause between consecutive batches; zero disables it.
    pub batch_pause: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            batch_pause: Duration::ZERO,
        }
    }
}

impl CacheConfig {
    /// Defaults, overridden by `ACCULYNX_CACHE_REFRESH_SECS` and
    /// `ACCULYNX_CACHE_BATCH_PAUSE_MS` when set.
    ///
    /// # Errors
    /// Returns `Error::Config` if a value is malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = CacheConfig::default();
        if let Some(secs) = parse_env_u64(ENV_CACHE_REFRESH_SECS)? {
            config = config.with_refresh_interval(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_env_u64(ENV_CACHE_BATCH_PAUSE_MS)? {
            config = config.with_batch_pause(Duration::from_millis(ms));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.batch_size == 0 || self.max_in_flight == 0 {
            return Err(Error::Config(
                "page_size, batch_size and max_in_flight must be positive".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(Error::Config(
                "refresh_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{} is not a number ({}): {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
