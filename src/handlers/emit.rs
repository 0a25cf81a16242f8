//! # Output boundary of handlers.
//!
//! [`Emit`] has two paths: one informational line per decoded record and one
//! error line per undecodable payload. Both are fire-and-forget.
//!
//! - [`TracingEmitter`] writes through `tracing` (the installed subscriber decides
//!   format and destination, see [`LogOptions`](crate::LogOptions)).
//! - [`MemoryEmitter`] records everything in memory, for tests and embedding.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info};

use crate::error::DecodeError;

/// Sink for handler output.
///
/// Implementations must not block and must not fail observably.
pub trait Emit: Send + Sync + 'static {
    /// Emits one rendered record line for `topic`.
    fn record(&self, topic: &str, line: &str);

    /// Reports a payload on `topic` that could not be decoded.
    fn decode_failed(&self, topic: &str, err: &DecodeError);
}

/// Emitter backed by the global `tracing` subscriber.
///
/// Record lines are `INFO` events on target `datasync::record`; decode failures are
/// `ERROR` events. Both carry a `topic` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl TracingEmitter {
    /// Construct a new [`TracingEmitter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Emit for TracingEmitter {
    fn record(&self, topic: &str, line: &str) {
        info!(target: "datasync::record", topic, "{line}");
    }

    fn decode_failed(&self, topic: &str, err: &DecodeError) {
        error!(topic, error = %err, label = err.as_label(), "failed to decode message");
    }
}

/// One captured emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    /// A rendered record line.
    Record {
        topic: String,
        line: String,
    },
    /// A decode failure (error rendered to text).
    DecodeFailed {
        topic: String,
        error: String,
    },
}

/// Emitter that keeps every emission in memory, in call order.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    out: Mutex<Vec<Emitted>>,
}

impl MemoryEmitter {
    /// Creates an empty emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn out(&self) -> MutexGuard<'_, Vec<Emitted>> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every emission so far.
    pub fn all(&self) -> Vec<Emitted> {
        self.out().clone()
    }

    /// Record lines emitted for `topic`, in order.
    pub fn records(&self, topic: &str) -> Vec<String> {
        self.out()
            .iter()
            .filter_map(|e| match e {
                Emitted::Record { topic: t, line } if t == topic => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Decode failures reported for `topic`, in order.
    pub fn errors(&self, topic: &str) -> Vec<String> {
        self.out()
            .iter()
            .filter_map(|e| match e {
                Emitted::DecodeFailed { topic: t, error } if t == topic => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of emissions so far.
    pub fn len(&self) -> usize {
        self.out().len()
    }

    /// True if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.out().is_empty()
    }
}

impl Emit for MemoryEmitter {
    fn record(&self, topic: &str, line: &str) {
        self.out().push(Emitted::Record {
            topic: topic.to_string(),
            line: line.to_string(),
        });
    }

    fn decode_failed(&self, topic: &str, err: &DecodeError) {
        self.out().push(Emitted::DecodeFailed {
            topic: topic.to_string(),
            error: err.to_string(),
        });
    }
}
