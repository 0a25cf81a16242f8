//! # Message handlers: decode a payload, emit one line per record.
//!
//! A handler is bound to exactly one subscriber and is invoked synchronously from
//! its receive loop, once per payload, in delivery order.
//!
//! ## Contents
//! - [`Handle`] the handler contract (`fn handle(&self, payload: &[u8])`)
//! - [`HandlerFn`] closure-backed handler
//! - [`RecordHandler`] schema-driven handler (decode → render → emit)
//! - [`Schema`] closed set of topic record shapes with their field layouts
//! - [`Emit`] output boundary; [`TracingEmitter`] (default) and [`MemoryEmitter`]
//!
//! ## Flow
//! ```text
//! payload ──► Schema::decode ──► Err(e) ──► Emit::decode_failed(topic, e)   (0 record lines)
//!                   │
//!                   └──► Ok([r1, r2, ..]) ──► for r in records (input order):
//!                                               Emit::record(topic, r.line(layout))
//! ```
//!
//! ## Rules
//! - A decode failure never escapes the handler; the stream keeps flowing.
//! - Each record is emitted independently.
//! - Field values pass through unmodified; only the join separator (`,`) is added.

mod emit;
mod handler;
mod handler_fn;
mod record;
mod schema;

pub use emit::{Emit, Emitted, MemoryEmitter, TracingEmitter};
pub use handler::{Handle, HandlerRef};
pub use handler_fn::HandlerFn;
pub use record::{Field, MempoolBatch, MempoolRecord, Record, RecordLine, Scalar, TxnRecord};
pub use schema::{RecordHandler, Schema};
