//! # Topic specification for supervised subscription.
//!
//! Defines [`TopicSpec`] the pairing of a topic name with the handler invoked for
//! each of its messages. A spec can be created:
//! - **Explicitly** with [`TopicSpec::new`] (any topic, any [`Handle`](crate::Handle))
//! - **From a schema** with [`TopicSpec::for_schema`] (default topic + [`RecordHandler`])
//!
//! ## Rules
//! - Specs are passed to [`Supervisor::run`](crate::Supervisor::run), one subscriber per spec.
//! - Topic names should be unique within one run; the backend decides what a duplicate means.

use std::sync::Arc;

use crate::handlers::{Emit, HandlerRef, RecordHandler, Schema};

/// Specification for subscribing to one topic.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use datasync::{HandlerFn, Schema, TopicSpec, TracingEmitter};
///
/// let txn = TopicSpec::for_schema(Schema::Txn, Arc::new(TracingEmitter::new()));
/// assert_eq!(txn.topic(), "txn_confirm_on_head");
///
/// let raw = TopicSpec::new("heartbeat", HandlerFn::arc(|_p: &[u8]| {}));
/// assert_eq!(raw.topic(), "heartbeat");
/// ```
#[derive(Clone)]
pub struct TopicSpec {
    topic: Arc<str>,
    handler: HandlerRef,
}

impl TopicSpec {
    /// Creates a spec binding `handler` to `topic`.
    pub fn new(topic: impl Into<Arc<str>>, handler: HandlerRef) -> Self {
        Self {
            topic: topic.into(),
            handler,
        }
    }

    /// Creates a spec for the schema's default topic, decoding with a [`RecordHandler`].
    pub fn for_schema(schema: Schema, emitter: Arc<dyn Emit>) -> Self {
        Self::new(schema.topic(), RecordHandler::arc(schema, emitter))
    }

    /// Creates a spec for `topic`, decoding `schema` records.
    pub fn with_schema(topic: impl Into<Arc<str>>, schema: Schema, emitter: Arc<dyn Emit>) -> Self {
        let topic = topic.into();
        let handler = Arc::new(RecordHandler::new(Arc::clone(&topic), schema, emitter));
        Self { topic, handler }
    }

    /// Returns the topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the bound handler.
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub(crate) fn topic_arc(&self) -> Arc<str> {
        Arc::clone(&self.topic)
    }
}

impl std::fmt::Debug for TopicSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicSpec")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
