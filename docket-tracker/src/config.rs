//! Tracker configuration
//!
//! Defines the tunables for polling, bounded retries and the login redirect,
//! together with the service connection settings.

use std::time::Duration;

/// Tracker configuration
///
/// All intervals and caps are configurable to allow tuning for different
/// deployments (local service vs. a slow shared one).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Pipeline service base URL (e.g., "http://localhost:8000")
    pub api_url: String,

    /// Default interval between status polls
    pub poll_interval: Duration,

    /// Consecutive failed config loads before giving up
    pub max_load_attempts: u32,

    /// Consecutive retryable poll failures before a subscription fails
    pub max_poll_failures: u32,

    /// Polling deadline after which a job is reported as stalled
    pub max_poll_duration: Option<Duration>,

    /// Delay before navigating to login after an authentication error
    pub login_redirect_delay: Duration,

    /// Initial backoff between config load attempts
    pub load_backoff: Duration,
}

impl TrackerConfig {
    /// Creates a new configuration with defaults
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            poll_interval: Duration::from_millis(2000),
            max_load_attempts: 3,
            max_poll_failures: 3,
            max_poll_duration: None,
            login_redirect_delay: Duration::from_millis(1500),
            load_backoff: Duration::from_millis(500),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DOCKET_API_URL (required)
    /// - DOCKET_POLL_INTERVAL_MS (optional, default: 2000)
    /// - DOCKET_MAX_LOAD_ATTEMPTS (optional, default: 3)
    /// - DOCKET_MAX_POLL_FAILURES (optional, default: 3)
    /// - DOCKET_MAX_POLL_DURATION_SECS (optional, default: unset)
    /// - DOCKET_LOGIN_REDIRECT_DELAY_MS (optional, default: 1500)
    /// - DOCKET_LOAD_BACKOFF_MS (optional, default: 500)
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = std::env::var("DOCKET_API_URL")
            .map_err(|_| anyhow::anyhow!("DOCKET_API_URL environment variable not set"))?;

        Ok(Self::new(api_url).with_env_overrides())
    }

    /// Apply the optional `DOCKET_*` tunables from the environment
    ///
    /// Unset or unparsable variables keep the current value.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(ms) = parse("DOCKET_POLL_INTERVAL_MS") {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse("DOCKET_MAX_LOAD_ATTEMPTS").and_then(|n| u32::try_from(n).ok()) {
            self.max_load_attempts = attempts;
        }
        if let Some(failures) = parse("DOCKET_MAX_POLL_FAILURES").and_then(|n| u32::try_from(n).ok()) {
            self.max_poll_failures = failures;
        }
        if let Some(secs) = parse("DOCKET_MAX_POLL_DURATION_SECS") {
            self.max_poll_duration = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = parse("DOCKET_LOGIN_REDIRECT_DELAY_MS") {
            self.login_redirect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse("DOCKET_LOAD_BACKOFF_MS") {
            self.load_backoff = Duration::from_millis(ms);
        }

        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_duration(mut self, limit: Duration) -> Self {
        self.max_poll_duration = Some(limit);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_load_attempts == 0 {
            anyhow::bail!("max_load_attempts must be greater than 0");
        }

        if self.max_poll_failures == 0 {
            anyhow::bail!("max_poll_failures must be greater than 0");
        }

        if self.max_poll_duration.is_some_and(|limit| limit < self.poll_interval) {
            anyhow::bail!("max_poll_duration must be at least one poll_interval");
        }

        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000".to_string())
    }
}
