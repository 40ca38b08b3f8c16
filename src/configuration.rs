//! Config for the duel client behaviors
//!
//! This module provides configuration options for controlling how the client talks to the duel
//! service and how it paces its background work.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive: set the value to `"true"` to enable one.
//! Durations are given in milliseconds; values that do not parse are ignored.
//!
//! - `DUEL_BASE_URL`: Base URL of the duel service API (default: `http://localhost/api`)
//! - `DUEL_LOG`: Enable logging to a file (default: `false`)
//! - `DUEL_LOG_DIR`: Directory receiving the log file (default: current directory)
//! - `DUEL_POLL_INTERVAL_MS`: Delay between two submission status polls (default: `1000`)
//! - `DUEL_FINISH_GRACE_MS`: Delay before reading the final duel result (default: `2000`)
//! - `DUEL_JOIN_TIMEOUT_MS`: Maximum wait for each submission poller on shutdown (default: `1000`)
//! - `DUEL_REQUEST_TIMEOUT_MS`: Timeout of regular API requests, not the event stream (default: `10000`)

use std::{path::PathBuf, time::Duration};

/// Configuration for the duel client.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) base_url: String,
    pub(crate) log: bool,
    pub(crate) log_dir: PathBuf,
    pub(crate) poll_interval: Duration,
    pub(crate) finish_grace: Duration,
    pub(crate) join_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

impl Configuration {
    const DEFAULT_BASE_URL: &'static str = "http://localhost/api";

    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The service is expected at `http://localhost/api`.
    /// - Logging to file is disabled.
    /// - Submissions are polled every second.
    /// - The final duel result is read two seconds after the duel finished.
    /// - Each poller gets one second to stop on shutdown.
    /// - Regular requests time out after ten seconds.
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            log: false,
            log_dir: PathBuf::from("."),
            poll_interval: Duration::from_millis(1000),
            finish_grace: Duration::from_millis(2000),
            join_timeout: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(10_000),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the [module documentation](self) for the recognized variables. Any unset or
    /// unparsable variable keeps its default value.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_millis(var: &str, default: Duration) -> Duration {
            std::env::var(var)
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        }

        let default = Self::new();
        let base_url = std::env::var("DUEL_BASE_URL").unwrap_or(default.base_url);

        Self {
            base_url: trim_base_url(&base_url),
            log: get_env_flag("DUEL_LOG", default.log),
            log_dir: std::env::var_os("DUEL_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.log_dir),
            poll_interval: get_env_millis("DUEL_POLL_INTERVAL_MS", default.poll_interval),
            finish_grace: get_env_millis("DUEL_FINISH_GRACE_MS", default.finish_grace),
            join_timeout: get_env_millis("DUEL_JOIN_TIMEOUT_MS", default.join_timeout),
            request_timeout: get_env_millis("DUEL_REQUEST_TIMEOUT_MS", default.request_timeout),
        }
    }

    /// Set the base URL of the service API. A trailing `/` is removed.
    pub fn with_base_url(mut self, value: impl AsRef<str>) -> Self {
        self.base_url = trim_base_url(value.as_ref());
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Directory where the log file is created.
    pub fn with_log_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.log_dir = value.into();
        self
    }

    /// Delay between two status requests of the same submission.
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Delay between a `DuelFinished` event and the final result request.
    ///
    /// The service persists the result slightly after emitting the event.
    pub fn with_finish_grace(mut self, value: Duration) -> Self {
        self.finish_grace = value;
        self
    }

    /// Maximum wait for each submission poller when the duel ends.
    pub fn with_join_timeout(mut self, value: Duration) -> Self {
        self.join_timeout = value;
        self
    }

    /// Timeout applied to every request except the event stream.
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Base URL of the service API, without trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True if logs should be written to a file.
    pub fn log(&self) -> bool {
        self.log
    }

    /// Directory receiving the log file.
    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    /// Timeout applied to regular requests.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}
