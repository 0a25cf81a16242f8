//! # In-process backend.
//!
//! [`MemoryBackend`] keeps one unbounded channel per topic. Producers call
//! [`MemoryBackend::publish`]; the single consumer obtains the receiving half via
//! [`Backend::subscribe`]. Closing a topic drops the sending half, so the consumer
//! drains whatever is buffered and then observes end-of-stream.
//!
//! ## Rules
//! - Topics are created lazily by the first `publish`, `close`, `reject` or `subscribe`.
//! - Publishing before subscribing is allowed (messages are buffered).
//! - A topic has at most one consumer; a second subscribe fails with `AlreadySubscribed`.
//! - `reject(topic, reason)` makes subsequent subscribes fail with `Rejected`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BackendError;

use super::{Backend, Subscription};

/// Per-topic channel halves.
struct TopicState {
    /// Producer side; `None` once the topic is closed.
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    /// Consumer side; `None` once handed out to a subscriber.
    rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    /// Subscribe failure to report, if any.
    rejected: Option<String>,
}

impl TopicState {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
            rejected: None,
        }
    }
}

/// In-memory message bus with per-topic FIFO delivery.
///
/// Cheap to clone; clones share the same topics.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, TopicState>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a payload to `topic`.
    ///
    /// Returns `false` if the topic is closed or its consumer is gone.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        let mut topics = self.topics();
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);
        match &state.tx {
            Some(tx) => tx.send(payload.into()).is_ok(),
            None => false,
        }
    }

    /// Ends the stream of `topic`; buffered payloads are still delivered.
    pub fn close(&self, topic: &str) {
        let mut topics = self.topics();
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);
        state.tx = None;
    }

    /// Ends the stream of every known topic.
    pub fn close_all(&self) {
        for state in self.topics().values_mut() {
            state.tx = None;
        }
    }

    /// Makes subsequent subscriptions to `topic` fail with `reason`.
    pub fn reject(&self, topic: &str, reason: impl Into<String>) {
        let mut topics = self.topics();
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);
        state.rejected = Some(reason.into());
    }

    /// Returns true if `topic` has been handed to a consumer.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics()
            .get(topic)
            .map(|s| s.rx.is_none())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BackendError> {
        let mut topics = self.topics();
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(TopicState::new);

        if let Some(reason) = &state.rejected {
            return Err(BackendError::Rejected {
                reason: reason.clone(),
            });
        }
        match state.rx.take() {
            Some(rx) => Ok(Box::new(MemorySubscription { rx })),
            None => Err(BackendError::AlreadySubscribed(topic.to_string())),
        }
    }
}

/// Consumer half of one in-memory topic.
struct MemorySubscription {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffered_messages_drain_before_close() {
        let bus = MemoryBackend::new();
        assert!(bus.publish("a", b"one".to_vec()));
        assert!(bus.publish("a", b"two".to_vec()));
        bus.close("a");
        assert!(!bus.publish("a", b"late".to_vec()));

        let mut sub = bus.subscribe("a").await.unwrap();
        assert_eq!(sub.recv().await.as_deref(), Some(&b"one"[..]));
        assert_eq!(sub.recv().await.as_deref(), Some(&b"two"[..]));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn second_subscribe_is_refused() {
        let bus = MemoryBackend::new();
        let _first = bus.subscribe("a").await.unwrap();
        assert!(bus.is_subscribed("a"));
        match bus.subscribe("a").await {
            Err(BackendError::AlreadySubscribed(topic)) => assert_eq!(topic, "a"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("second subscribe must fail"),
        }
    }

    #[tokio::test]
    async fn rejected_topic_fails_subscribe() {
        let bus = MemoryBackend::new();
        bus.reject("b", "unauthorized");
        match bus.subscribe("b").await {
            Err(BackendError::Rejected { reason }) => assert_eq!(reason, "unauthorized"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("rejected topic must fail"),
        }
        assert!(!bus.is_subscribed("b"));
    }

    #[tokio::test]
    async fn close_all_ends_every_stream() {
        let bus = MemoryBackend::new();
        let mut a = bus.subscribe("a").await.unwrap();
        let mut b = bus.subscribe("b").await.unwrap();
        bus.close_all();
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
    }
}
