//! # Subscriber: one topic, one receive loop.
//!
//! Owns the subscription to a single topic and drives its receive loop as an
//! independently scheduled task.
//!
//! ## Rules
//! - The loop observes cancellation **before** each receive (biased select), so once the
//!   token is cancelled no further handler call starts.
//! - A handler call in progress is never interrupted; cancellation is honoured at the
//!   next wait boundary.
//! - Upstream close ends the loop normally.
//! - The completion guard is owned by the loop future: every exit path (including panic
//!   and abort) signals completion exactly once.
//! - [`Subscriber::cancel`] is idempotent and safe before, during and after the loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use crate::backend::{Backend, Subscription};
use crate::core::{CompletionGuard, CompletionToken};
use crate::error::RuntimeError;
use crate::handlers::HandlerRef;

use super::spec::TopicSpec;

/// Why a receive loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The subscriber's token was cancelled.
    Cancelled,
    /// The backend closed the stream.
    UpstreamClosed,
}

impl ExitReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitReason::Cancelled => "cancelled",
            ExitReason::UpstreamClosed => "upstream_closed",
        }
    }
}

/// Owned handle to one running topic subscription.
pub struct Subscriber {
    topic: Arc<str>,
    cancel: CancellationToken,
    join: Option<JoinHandle<ExitReason>>,
}

impl Subscriber {
    /// Subscribes to the topic of `spec` and starts the receive loop.
    ///
    /// The subscriber's token is a child of `parent`: cancelling the parent cancels
    /// every subscriber created from it. The loop is registered with `completion`
    /// only once the subscription exists, so a failed create leaves no outstanding unit.
    pub async fn create(
        spec: &TopicSpec,
        backend: &dyn Backend,
        completion: &CompletionToken,
        parent: &CancellationToken,
    ) -> Result<Self, RuntimeError> {
        let topic = spec.topic_arc();
        let sub = backend
            .subscribe(&topic)
            .await
            .map_err(|source| RuntimeError::Subscribe {
                topic: topic.to_string(),
                source,
            })?;

        let cancel = parent.child_token();
        let guard = completion.register();
        let span = info_span!("subscriber", topic = %topic);
        let join = tokio::spawn(
            receive_loop(sub, Arc::clone(spec.handler()), cancel.clone(), guard).instrument(span),
        );
        debug!(topic = %topic, "subscriber started");

        Ok(Self {
            topic,
            cancel,
            join: Some(join),
        })
    }

    /// Returns the topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Signals the receive loop to stop at its next wait boundary. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true once the receive loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the receive loop to exit.
    ///
    /// Returns the exit reason the first time; `None` if the loop panicked or was
    /// aborted, or on any later call.
    pub async fn wait(&mut self) -> Option<ExitReason> {
        let join = self.join.as_mut()?;
        let res = join.await;
        self.join = None;
        match res {
            Ok(reason) => Some(reason),
            Err(e) if e.is_panic() => {
                error!(topic = %self.topic, "receive loop panicked");
                None
            }
            Err(_) => None,
        }
    }

    /// Aborts the receive loop task without waiting for it.
    pub(crate) fn abort(&self) {
        if let Some(join) = &self.join {
            join.abort();
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Drives one subscription until cancellation or upstream close.
///
/// `_done` is released when this future completes or is dropped.
async fn receive_loop(
    mut sub: Box<dyn Subscription>,
    handler: HandlerRef,
    cancel: CancellationToken,
    _done: CompletionGuard,
) -> ExitReason {
    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break ExitReason::Cancelled,
            msg = sub.recv() => match msg {
                Some(payload) => handler.handle(&payload),
                None => break ExitReason::UpstreamClosed,
            },
        }
    };
    sub.close().await;
    debug!(reason = reason.as_label(), "receive loop exited");
    reason
}
