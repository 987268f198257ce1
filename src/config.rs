use std::time::Duration;

use anyhow::{bail, Result};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.gitcast.dev";
pub const DEFAULT_VIEWER_FID: u64 = 6023;
const DEFAULT_FEED_LIMIT: u32 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_THRESHOLD: u64 = 10;
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// stop early once the backend reports at least this many events
    pub threshold: u64,
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_POLL_THRESHOLD,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub default_fid: u64,
    pub feed_limit: u32,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_fid: DEFAULT_VIEWER_FID,
            feed_limit: DEFAULT_FEED_LIMIT,
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("GITCAST_BASE_URL") {
            cfg.base_url = base;
        }
        if let Some(secs) = env_parse::<u64>("GITCAST_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(fid) = env_parse("GITCAST_DEFAULT_FID") {
            cfg.default_fid = fid;
        }
        if let Some(limit) = env_parse("GITCAST_FEED_LIMIT") {
            cfg.feed_limit = limit;
        }
        if let Some(t) = env_parse("GITCAST_POLL_THRESHOLD") {
            cfg.poll.threshold = t;
        }
        if let Some(n) = env_parse("GITCAST_POLL_MAX_ATTEMPTS") {
            cfg.poll.max_attempts = n;
        }
        if let Some(ms) = env_parse::<u64>("GITCAST_POLL_INTERVAL_MS") {
            cfg.poll.interval = Duration::from_millis(ms);
        }
        cfg
    }

    /// Friendly error before any network I/O.
    pub fn validate(&self) -> Result<()> {
        let url = match Url::parse(&self.base_url) {
            Ok(u) => u,
            Err(_) => bail!("Invalid base URL: {}", self.base_url),
        };
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Base URL must be http(s): {}", self.base_url);
        }
        if self.poll.max_attempts == 0 {
            bail!("poll max attempts must be at least 1");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
