//! # Backend connection parameters.

use std::time::Duration;

/// Connection parameters shared by every topic subscription.
///
/// ## Field semantics
/// - `endpoint`: backend address; may contain a `{topic}` placeholder
/// - `connect_timeout`: upper bound for establishing one subscription (`0s` = unbounded)
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Backend address.
    pub endpoint: String,
    /// Maximum time to establish one subscription.
    pub connect_timeout: Duration,
}

impl BackendConfig {
    /// Creates a config for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Returns the connect timeout as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → bounded connect
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout == Duration::ZERO {
            None
        } else {
            Some(self.connect_timeout)
        }
    }

    /// Resolves the address used for `topic`.
    ///
    /// A `{topic}` placeholder is substituted; otherwise the topic is appended as a path segment.
    pub fn topic_url(&self, topic: &str) -> String {
        if self.endpoint.contains("{topic}") {
            self.endpoint.replace("{topic}", topic)
        } else {
            format!("{}/{}", self.endpoint.trim_end_matches('/'), topic)
        }
    }
}

impl Default for BackendConfig {
    /// Default configuration:
    ///
    /// - `endpoint = "ws://127.0.0.1:8080"`
    /// - `connect_timeout = 5s`
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}
