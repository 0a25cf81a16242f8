//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] runtime settings for [`Supervisor`](crate::Supervisor).
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for receive loops after cancellation; abort whatever is still running

use std::time::Duration;

/// Runtime configuration for the supervisor.
///
/// ## Field semantics
/// - `grace`: maximum wait for receive loops to exit once DRAINING starts
///
/// The topic set is not part of the config: it is passed to
/// [`Supervisor::run`](crate::Supervisor::run) as a list of [`TopicSpec`](crate::TopicSpec).
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for receive loops to exit after cancellation.
    ///
    /// When DRAINING starts:
    /// - every subscriber is cancelled
    /// - the supervisor waits up to `grace` for their loops to exit
    /// - loops still running are aborted and the run returns `RuntimeError::GraceExceeded`
    pub grace: Duration,
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
        }
    }
}
