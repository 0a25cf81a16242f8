//! # Topic subscribers.
//!
//! A [`Subscriber`] owns one topic subscription: a cancellation token, a completion
//! guard and a background receive loop that feeds each payload to its handler.
//!
//! ## Architecture
//! ```text
//! TopicSpec ──► Subscriber::create(spec, backend, completion, parent_token)
//!                  ├─► backend.subscribe(topic)            (failure → RuntimeError::Subscribe)
//!                  ├─► completion.register()               (guard moved into the loop)
//!                  └─► tokio::spawn(receive_loop)
//!
//! receive_loop:
//!   loop {
//!     select! (biased) {
//!       token.cancelled()   ─► exit Cancelled
//!       sub.recv() = Some(p) ─► handler.handle(&p)        (synchronous, loop continues)
//!       sub.recv() = None    ─► exit UpstreamClosed
//!     }
//!   }
//!   sub.close(); drop(guard)                              (exactly one completion signal)
//! ```

mod spec;
mod subscriber;

pub use spec::TopicSpec;
pub use subscriber::{ExitReason, Subscriber};
