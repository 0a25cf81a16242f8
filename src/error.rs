//! Error types used by the datasync runtime, backends and handlers.
//!
//! This module defines the error enums of the crate:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (startup, shutdown).
//! - [`BackendError`]: errors raised by a messaging backend while subscribing.
//! - [`DecodeError`]: a payload that does not match the topic's record shape.
//!
//! Every type provides `as_label` (stable snake_case label for logs/metrics).
//! Only [`RuntimeError`] ever reaches the caller of [`Supervisor::run`](crate::Supervisor::run);
//! decode errors are logged and swallowed by the handler.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// These represent failures of the orchestration itself: a topic that could not be
/// subscribed during startup, a termination trap that could not be installed, or a
/// drain that did not finish within the grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A topic subscription could not be established during startup.
    ///
    /// Subscribers created before the failing one are cancelled before this is returned.
    #[error("subscribe to topic {topic:?} failed: {source}")]
    Subscribe {
        /// Topic whose subscription failed.
        topic: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },

    /// The process termination trap could not be registered.
    #[error("termination signal registration failed: {0}")]
    Signal(#[from] std::io::Error),

    /// Receive loops did not exit within the grace period after cancellation and were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Topics whose receive loop was still running.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use datasync::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Subscribe { .. } => "runtime_subscribe_failed",
            RuntimeError::Signal(_) => "runtime_signal_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by a messaging backend.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection to the backend could not be established.
    #[error("connect to {endpoint} failed: {reason}")]
    Connect {
        /// Endpoint that was dialed.
        endpoint: String,
        /// Underlying failure message.
        reason: String,
    },

    /// Connection attempt exceeded the configured timeout.
    #[error("connect to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint that was dialed.
        endpoint: String,
        /// The configured connect timeout.
        timeout: Duration,
    },

    /// Backend refused the subscription.
    #[error("subscription rejected: {reason}")]
    Rejected {
        /// Reason reported by the backend.
        reason: String,
    },

    /// The topic already has an active consumer.
    #[error("topic {0:?} is already subscribed")]
    AlreadySubscribed(String),
}

impl BackendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Connect { .. } => "backend_connect_failed",
            BackendError::Timeout { .. } => "backend_connect_timeout",
            BackendError::Rejected { .. } => "backend_rejected",
            BackendError::AlreadySubscribed(_) => "backend_already_subscribed",
        }
    }
}

/// # A message payload that does not decode into the topic's record shape.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload is not valid JSON or does not match the schema.
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl DecodeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DecodeError::Json(_) => "decode_json",
        }
    }
}
