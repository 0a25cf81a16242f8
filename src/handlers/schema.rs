//! # Topic schemas and the schema-driven handler.
//!
//! [`Schema`] is the closed set of record shapes the service understands. Each
//! variant carries its default topic name, its decoder and its field layout:
//!
//! | Schema           | Topic                 | Payload          | Layout                           |
//! |------------------|-----------------------|------------------|----------------------------------|
//! | `Txn`            | `txn_confirm_on_head` | one record       | hash, function, height, timestamp |
//! | `MempoolInsert`  | `mempool_insert`      | `{"txns": [..]}` | hash, function, packing, timestamp |
//! | `MempoolConfirm` | `mempool_confirm`     | `{"txns": [..]}` | hash, function, packing, timestamp |
//!
//! [`RecordHandler`] binds a schema to a topic and an [`Emit`] sink; the receive loop
//! is shared by all topics, only this data differs.

use std::fmt;
use std::sync::Arc;

use crate::error::DecodeError;

use super::emit::Emit;
use super::handler::Handle;
use super::record::{Field, MempoolBatch, Record, TxnRecord};

const TXN_LAYOUT: &[Field] = &[Field::Hash, Field::Function, Field::Height, Field::Timestamp];
const MEMPOOL_LAYOUT: &[Field] = &[
    Field::Hash,
    Field::Function,
    Field::Packing,
    Field::Timestamp,
];

/// Record shape of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Transactions confirmed on the chain head (single record per message).
    Txn,
    /// Transactions inserted into the mempool (collection per message).
    MempoolInsert,
    /// Mempool transactions that got confirmed (collection per message).
    MempoolConfirm,
}

impl Schema {
    /// Every schema, in default subscription order.
    pub const ALL: [Schema; 3] = [Schema::Txn, Schema::MempoolInsert, Schema::MempoolConfirm];

    /// Default topic name carrying this schema.
    pub fn topic(self) -> &'static str {
        match self {
            Schema::Txn => "txn_confirm_on_head",
            Schema::MempoolInsert => "mempool_insert",
            Schema::MempoolConfirm => "mempool_confirm",
        }
    }

    /// Resolves a schema from its default topic name.
    pub fn from_topic(topic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.topic() == topic)
    }

    /// Field order of rendered lines.
    pub fn layout(self) -> &'static [Field] {
        match self {
            Schema::Txn => TXN_LAYOUT,
            Schema::MempoolInsert | Schema::MempoolConfirm => MEMPOOL_LAYOUT,
        }
    }

    /// Decodes one payload into its records, in payload order.
    pub fn decode(self, payload: &[u8]) -> Result<Vec<Record>, DecodeError> {
        match self {
            Schema::Txn => {
                let txn: TxnRecord = serde_json::from_slice(payload)?;
                Ok(vec![Record::Txn(txn)])
            }
            Schema::MempoolInsert | Schema::MempoolConfirm => {
                let batch: MempoolBatch = serde_json::from_slice(payload)?;
                Ok(batch.txns.into_iter().map(Record::Mempool).collect())
            }
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// Decode + emit handler for one topic.
pub struct RecordHandler {
    topic: Arc<str>,
    schema: Schema,
    emitter: Arc<dyn Emit>,
}

impl RecordHandler {
    /// Creates a handler decoding `schema` payloads received on `topic`.
    pub fn new(topic: impl Into<Arc<str>>, schema: Schema, emitter: Arc<dyn Emit>) -> Self {
        Self {
            topic: topic.into(),
            schema,
            emitter,
        }
    }

    /// Creates the handler for the schema's default topic and returns it shared.
    pub fn arc(schema: Schema, emitter: Arc<dyn Emit>) -> Arc<Self> {
        Arc::new(Self::new(schema.topic(), schema, emitter))
    }

    /// Topic this handler reports under.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Schema this handler decodes.
    pub fn schema(&self) -> Schema {
        self.schema
    }
}

impl Handle for RecordHandler {
    fn handle(&self, payload: &[u8]) {
        let records = match self.schema.decode(payload) {
            Ok(records) => records,
            Err(e) => {
                self.emitter.decode_failed(&self.topic, &e);
                return;
            }
        };
        let layout = self.schema.layout();
        for record in &records {
            self.emitter
                .record(&self.topic, &record.line(layout).to_string());
        }
    }
}
