//! # Handler contract.

use std::sync::Arc;

/// # Synchronous per-message callback.
///
/// Called from the owning subscriber's receive loop with each raw payload.
///
/// ### Implementation requirements
/// - Return quickly and never block: cancellation is only observed between calls.
/// - Handle every failure internally; there is no error channel back to the loop.
/// - Hold no state shared with other subscribers.
///
/// # Example
/// ```
/// use datasync::Handle;
///
/// struct Count(std::sync::atomic::AtomicUsize);
///
/// impl Handle for Count {
///     fn handle(&self, _payload: &[u8]) {
///         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///     }
/// }
/// ```
pub trait Handle: Send + Sync + 'static {
    /// Processes one raw payload.
    fn handle(&self, payload: &[u8]);
}

/// Shared handle to a handler (`Arc<dyn Handle>`).
pub type HandlerRef = Arc<dyn Handle>;
