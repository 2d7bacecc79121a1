//! Configuration for the alerting client.
//!
//! The host resolves an API key and collector endpoint however it likes and
//! hands them over through [`Config::new`]. For processes that keep their
//! settings in the environment, [`Config::from_env`] reads the same values
//! from `ALERTLINE_*` variables with validated ranges.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::breadcrumb::DEFAULT_BREADCRUMB_CAPACITY;
use crate::fingerprint::SuppressionPolicy;

/// Default collector endpoint (a locally running collector)
const DEFAULT_ENDPOINT: &str = "http://localhost:8787";

/// Default environment name
const DEFAULT_ENVIRONMENT: &str = "development";

/// Default number of events per transmission
const DEFAULT_BATCH_SIZE: usize = 20;

/// Maximum allowed batch size
const MAX_BATCH_SIZE: usize = 1_000;

/// Default number of events held in memory awaiting delivery
const DEFAULT_QUEUE_CAPACITY: usize = 1_000;

/// Maximum allowed queue capacity
const MAX_QUEUE_CAPACITY: usize = 100_000;

/// Default total delivery attempts per event
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Maximum allowed delivery attempts per event
const MAX_MAX_ATTEMPTS: u32 = 20;

/// Default per-attempt request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default background flush interval in seconds
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

/// Minimum flush interval to avoid hammering the collector
const MIN_FLUSH_INTERVAL_SECS: u64 = 1;

/// Maximum flush interval to keep alerts timely
const MAX_FLUSH_INTERVAL_SECS: u64 = 300;

/// Maximum allowed breadcrumb trail capacity
const MAX_BREADCRUMB_CAPACITY: usize = 10_000;

/// Default base delay for exponential backoff
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default cap on the delay between retries
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Error type for configuration loading failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Configuration error for {0}: variable is required")]
    Missing(String),

    /// A variable is set but its value is unusable
    #[error("Configuration error for {var}: {message}")]
    Invalid { var: String, message: String },
}

impl ConfigError {
    fn invalid(var: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

/// Retry schedule for failed transmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per event, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Client configuration. Immutable once a client has been built from it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key identifying the workspace at the collector
    pub api_key: String,

    /// Base URL of the collector, without trailing slash
    pub endpoint: String,

    /// Deployment environment reported with each event
    pub environment: String,

    /// Release version reported with each event
    pub release: String,

    /// Install a panic hook that captures panics as critical events
    pub auto_capture_errors: bool,

    /// Record a breadcrumb for every captured event and alert
    pub auto_breadcrumbs: bool,

    /// Maximum events per transmission
    pub batch_size: usize,

    /// Maximum events waiting for delivery
    pub queue_capacity: usize,

    /// Breadcrumbs retained in the trail
    pub breadcrumb_capacity: usize,

    /// Timeout for each transmission attempt
    pub request_timeout: Duration,

    /// Interval of the background flusher
    pub flush_interval: Duration,

    pub retry: RetryPolicy,

    /// Local rate limits per severity (none by default)
    pub suppression: SuppressionPolicy,
}

impl Config {
    /// Create a configuration for the given key and endpoint with defaults
    /// for everything else.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: normalize_endpoint(&endpoint.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `ALERTLINE_API_KEY` is missing or blank
    /// - a numeric variable is not a number or is out of range
    /// - a boolean variable is not `true`/`false`/`1`/`0`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ALERTLINE_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing("ALERTLINE_API_KEY".to_string()))?;

        let endpoint = env::var("ALERTLINE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let environment =
            env::var("ALERTLINE_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());

        let release =
            env::var("ALERTLINE_RELEASE").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let retry = RetryPolicy {
            max_attempts: parse_ranged(
                "ALERTLINE_MAX_ATTEMPTS",
                DEFAULT_MAX_ATTEMPTS,
                1,
                MAX_MAX_ATTEMPTS,
            )?,
            ..RetryPolicy::default()
        };

        let flush_interval_secs = parse_ranged(
            "ALERTLINE_FLUSH_INTERVAL_SECS",
            DEFAULT_FLUSH_INTERVAL_SECS,
            MIN_FLUSH_INTERVAL_SECS,
            MAX_FLUSH_INTERVAL_SECS,
        )?;

        // Optional, any positive value is accepted
        let request_timeout_secs = parse_ranged(
            "ALERTLINE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1,
            u64::MAX,
        )?;

        Ok(Self {
            api_key,
            endpoint: normalize_endpoint(&endpoint),
            environment,
            release,
            auto_capture_errors: parse_flag("ALERTLINE_AUTO_CAPTURE_ERRORS", true)?,
            auto_breadcrumbs: parse_flag("ALERTLINE_AUTO_BREADCRUMBS", true)?,
            batch_size: parse_ranged("ALERTLINE_BATCH_SIZE", DEFAULT_BATCH_SIZE, 1, MAX_BATCH_SIZE)?,
            queue_capacity: parse_ranged(
                "ALERTLINE_QUEUE_CAPACITY",
                DEFAULT_QUEUE_CAPACITY,
                1,
                MAX_QUEUE_CAPACITY,
            )?,
            breadcrumb_capacity: parse_ranged(
                "ALERTLINE_BREADCRUMB_CAPACITY",
                DEFAULT_BREADCRUMB_CAPACITY,
                0,
                MAX_BREADCRUMB_CAPACITY,
            )?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            flush_interval: Duration::from_secs(flush_interval_secs),
            retry,
            suppression: SuppressionPolicy::disabled(),
        })
    }

    /// URL that batches are posted to.
    pub fn ingest_url(&self) -> String {
        format!("{}/alerts/{}", self.endpoint, self.api_key)
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn with_auto_capture_errors(mut self, enabled: bool) -> Self {
        self.auto_capture_errors = enabled;
        self
    }

    pub fn with_auto_breadcrumbs(mut self, enabled: bool) -> Self {
        self.auto_breadcrumbs = enabled;
        self
    }

    /// Set the batch size. Zero is raised to one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the queue capacity. Zero is raised to one.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_breadcrumb_capacity(mut self, capacity: usize) -> Self {
        self.breadcrumb_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the retry schedule. `max_attempts` is raised to at least one.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    pub fn with_suppression(mut self, suppression: SuppressionPolicy) -> Self {
        self.suppression = suppression;
        self
    }
}

impl Default for Config {
    /// Defaults with an empty API key. Useful for tests and for
    /// [`Config::new`].
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            auto_capture_errors: true,
            auto_breadcrumbs: true,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            breadcrumb_capacity: DEFAULT_BREADCRUMB_CAPACITY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            retry: RetryPolicy::default(),
            suppression: SuppressionPolicy::disabled(),
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// Parse a numeric variable, falling back to `default` when unset.
fn parse_ranged<T>(var: &str, default: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Ok(value) = env::var(var) else {
        return Ok(default);
    };

    let parsed: T = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(var, format!("'{}' is not a valid number", value)))?;

    if parsed < min {
        return Err(ConfigError::invalid(
            var,
            format!("{} is below minimum ({})", parsed, min),
        ));
    }
    if parsed > max {
        return Err(ConfigError::invalid(
            var,
            format!("{} exceeds maximum allowed ({})", parsed, max),
        ));
    }

    Ok(parsed)
}

fn parse_flag(var: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::invalid(
                var,
                format!("'{}' is not a valid boolean", value),
            )),
        },
        Err(_) => Ok(default),
    }
}
