//! Configuration types for actions-top

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Remote API connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root (default: "https://api.github.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token attached to every request
    ///
    /// Never serialized back out.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// User-Agent header (GitHub rejects requests without one)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header value
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Items requested per page (default: 100, the API maximum)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Timeout of a single HTTP request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            user_agent: default_user_agent(),
            accept: default_accept(),
            per_page: default_per_page(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Poll cycle settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum fetch jobs in flight at once (default: 40)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Also query completed runs created within the last N hours (default: 8)
    ///
    /// `None` drops the `completed` filter entirely.
    #[serde(default = "default_completed_since_hours")]
    pub completed_since_hours: Option<u32>,

    /// Only poll repositories pushed to within the last N hours
    ///
    /// When unset, twice the completed lookback is used (16 hours if the
    /// completed filter is off).
    #[serde(default)]
    pub activity_window_hours: Option<u32>,

    /// Poll every repository, ignoring recent activity
    #[serde(default)]
    pub fetch_all_groups: bool,

    /// Include run URLs in presentation records
    #[serde(default)]
    pub show_urls: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            completed_since_hours: default_completed_since_hours(),
            activity_window_hours: None,
            fetch_all_groups: false,
            show_urls: false,
        }
    }
}

impl PollConfig {
    /// Recent-activity threshold used to pre-filter repositories
    pub fn effective_activity_window(&self) -> chrono::Duration {
        let hours = self.activity_window_hours.unwrap_or_else(|| {
            self.completed_since_hours
                .map(|h| h.saturating_mul(2))
                .unwrap_or(DEFAULT_ACTIVITY_WINDOW_HOURS)
        });
        chrono::Duration::hours(i64::from(hours))
    }
}

/// Retry behavior for individual page requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2, 0 disables retrying)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }
}

/// Main configuration for [`ActionsPoller`](crate::ActionsPoller)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Poll cycle settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Page request retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Check the configuration before any request is made
    ///
    /// A missing or blank token is a fatal setup error.
    pub fn validate(&self) -> Result<()> {
        match self.api.token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => return Err(Error::MissingCredential),
        }

        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config("api.base_url", format!("invalid URL: {e}")))?;

        if self.api.per_page == 0 {
            return Err(Error::config(
                "api.per_page",
                "page size must be greater than zero",
            ));
        }

        if self.poll.max_concurrent_requests == 0 {
            return Err(Error::config(
                "poll.max_concurrent_requests",
                "at least one concurrent request is required",
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be at least 1.0",
            ));
        }

        Ok(())
    }
}

const DEFAULT_ACTIVITY_WINDOW_HOURS: u32 = 16;

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    concat!("actions-top/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_accept() -> String {
    "application/vnd.github.v3+json".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_requests() -> usize {
    40
}

fn default_completed_since_hours() -> Option<u32> {
    Some(8)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
