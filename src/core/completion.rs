//! # Completion token: count of outstanding receive loops.
//!
//! ```text
//! Subscriber::create ──► CompletionToken::register() ──► CompletionGuard (moved into loop)
//!                                                              │
//!                               loop exits (any path) ──► drop(guard) ──► count -= 1
//!
//! Supervisor ──► CompletionToken::exhausted().await   (resolves when count == 0)
//! ```
//!
//! ## Rules
//! - Each guard decrements **exactly once**, from `Drop`: normal exit, early return,
//!   panic unwinding and task abort all release it.
//! - The supervisor only reads; writers are the guards.
//! - Zero registered units means the token is already exhausted.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared counter of outstanding units.
///
/// Cheap to clone; clones observe the same count.
#[derive(Clone, Debug)]
pub struct CompletionToken {
    tx: Arc<watch::Sender<usize>>,
}

impl CompletionToken {
    /// Creates a token with no outstanding units.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self { tx: Arc::new(tx) }
    }

    /// Registers one more outstanding unit; dropping the guard signals it done.
    #[must_use = "dropping the guard immediately signals completion"]
    pub fn register(&self) -> CompletionGuard {
        self.tx.send_modify(|n| *n += 1);
        CompletionGuard {
            tx: Arc::clone(&self.tx),
        }
    }

    /// Number of units still outstanding.
    pub fn outstanding(&self) -> usize {
        *self.tx.borrow()
    }

    /// Resolves once every registered unit is done.
    pub async fn exhausted(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in `self`, so `wait_for` cannot observe a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for CompletionToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of one outstanding unit; signals completion when dropped.
#[derive(Debug)]
pub struct CompletionGuard {
    tx: Arc<watch::Sender<usize>>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tx.send_modify(|n| *n = n.saturating_sub(1));
    }
}
