//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&[u8])`. Useful for custom topics and tests
//! where a full [`RecordHandler`](crate::RecordHandler) is not needed.
//!
//! ## Example
//! ```rust
//! use datasync::{Handle, HandlerFn, HandlerRef};
//!
//! let h: HandlerRef = HandlerFn::arc(|payload: &[u8]| {
//!     let _ = payload.len();
//! });
//! h.handle(b"{}");
//! ```

use std::sync::Arc;

use super::handler::Handle;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> Handle for HandlerFn<F>
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    fn handle(&self, payload: &[u8]) {
        (self.f)(payload)
    }
}
