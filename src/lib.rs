//! # datasync
//!
//! **Datasync** subscribes to a fixed set of chain-data topics, decodes every message
//! into records and emits one log line per record, under a single supervisor that
//! owns startup, the shutdown race and the drain.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TopicSpec   │   │  TopicSpec   │   │  TopicSpec   │
//!     │ (topic + h1) │   │ (topic + h2) │   │ (topic + h3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (lifecycle coordinator)                               │
//! │  - Backend (subscribe per topic)                                  │
//! │  - CompletionToken (counts live receive loops)                    │
//! │  - Termination (SIGINT/SIGTERM, or a caller future)               │
//! │  - runtime CancellationToken (parent of every subscriber token)   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subscriber  │   │  Subscriber  │   │  Subscriber  │
//!     │ receive loop │   │ receive loop │   │ receive loop │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!        Handle::handle(payload)  ──►  Schema::decode ──► Emit::record / Emit::decode_failed
//! ```
//!
//! ### Lifecycle
//! ```text
//! STARTING ──► RUNNING ──► DRAINING ──► STOPPED
//!
//! RUNNING races:
//!   ├─ every receive loop ended (upstream closed)   ─► StopReason::Exhausted
//!   └─ termination requested (signal / future)      ─► StopReason::Terminated
//! DRAINING cancels every subscriber either way and joins their loops within `grace`.
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                          |
//! |-----------------|----------------------------------------------------------|---------------------------------------------|
//! | **Supervision** | Start, race, drain; observable state.                    | [`Supervisor`], [`SupervisorState`]         |
//! | **Subscribers** | One receive loop per topic with its own cancel token.    | [`Subscriber`], [`TopicSpec`]               |
//! | **Handlers**    | Decode payloads, render records, emit lines.             | [`Handle`], [`HandlerFn`], [`Schema`]       |
//! | **Backends**    | Topic transport.                                         | [`Backend`], [`MemoryBackend`], `WsBackend` |
//! | **Errors**      | Typed errors with stable labels.                         | [`RuntimeError`], [`BackendError`]          |
//! | **Logging**     | `--log.*` options installing the tracing subscriber.     | [`LogOptions`]                              |
//!
//! ## Optional features
//! - `websocket` _(default)_: exposes `WsBackend`, one WebSocket connection per topic.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use datasync::{HandlerFn, MemoryBackend, StopReason, Supervisor, SupervisorConfig, TopicSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = MemoryBackend::new();
//!     bus.publish("ticks", "hello");
//!     bus.close("ticks");
//!
//!     let spec = TopicSpec::new(
//!         "ticks",
//!         HandlerFn::arc(|payload: &[u8]| println!("{}", String::from_utf8_lossy(payload))),
//!     );
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus))
//!         .with_termination(std::future::pending())
//!         .build();
//!
//!     assert_eq!(sup.run(vec![spec]).await?, StopReason::Exhausted);
//!     Ok(())
//! }
//! ```
mod backend;
mod core;
mod error;
mod handlers;
mod log;
mod subscribers;

// ---- Public re-exports ----

pub use backend::{Backend, BackendConfig, MemoryBackend, Subscription};
pub use core::{
    CompletionGuard, CompletionToken, StopReason, Supervisor, SupervisorBuilder, SupervisorConfig,
    SupervisorState,
};
pub use error::{BackendError, DecodeError, RuntimeError};
pub use handlers::{
    Emit, Emitted, Field, Handle, HandlerFn, HandlerRef, MemoryEmitter, MempoolBatch,
    MempoolRecord, Record, RecordHandler, RecordLine, Scalar, Schema, TracingEmitter, TxnRecord,
};
pub use log::{LogOptions, LogOptionsError};
pub use subscribers::{ExitReason, Subscriber, TopicSpec};

// Optional: WebSocket transport.
// Disable with: `--no-default-features`
#[cfg(feature = "websocket")]
pub use backend::WsBackend;
