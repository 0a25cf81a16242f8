//! # Messaging backend boundary.
//!
//! The supervisor depends on the message bus only through two traits:
//! - [`Backend`] establishes one [`Subscription`] per topic;
//! - [`Subscription`] yields raw payloads until the upstream stream closes.
//!
//! ```text
//! Supervisor ──► Backend::subscribe(topic) ──► Box<dyn Subscription>
//!                                                   │
//!                            receive loop ◄── recv() ─┘  (None = stream closed)
//!                                 └──► close() on exit
//! ```
//!
//! ## Rules
//! - `recv()` **must be cancellation-safe**: it is raced against the subscriber's
//!   cancellation token and may be dropped at any await point.
//! - `recv()` returning `None` is not an error; it ends the receive loop normally.
//! - Retry, redelivery and offsets are the backend's concern, not the core's.
//!
//! ## Implementations
//! - [`MemoryBackend`] in-process topics (tests, demos, embedding);
//! - [`WsBackend`] one WebSocket connection per topic (feature `websocket`).

mod config;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

use async_trait::async_trait;

use crate::error::BackendError;

pub use config::BackendConfig;
pub use memory::MemoryBackend;
#[cfg(feature = "websocket")]
pub use websocket::WsBackend;

/// Factory of topic subscriptions.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Registers interest in `topic` and returns its message stream.
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BackendError>;
}

/// One live topic stream.
#[async_trait]
pub trait Subscription: Send + 'static {
    /// Waits for the next raw payload; `None` once the upstream stream is closed.
    ///
    /// Must be cancellation-safe.
    async fn recv(&mut self) -> Option<Vec<u8>>;

    /// Releases the subscription. Called once when the receive loop exits.
    async fn close(&mut self);
}
