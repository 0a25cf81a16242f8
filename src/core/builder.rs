use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::config::SupervisorConfig;
use super::supervisor::Supervisor;
use crate::backend::Backend;

/// Builder for constructing a [`Supervisor`] with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    backend: Arc<dyn Backend>,
    termination: Option<BoxFuture<'static, ()>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and backend.
    pub fn new(cfg: SupervisorConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            cfg,
            backend,
            termination: None,
        }
    }

    /// Replaces the process signal trap with a caller-provided termination future.
    ///
    /// The supervisor treats completion of `fut` exactly like SIGINT/SIGTERM.
    /// No signal listeners are installed when this is set.
    pub fn with_termination<F>(mut self, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.termination = Some(Box::pin(fut));
        self
    }

    /// Builds and returns the Supervisor instance.
    pub fn build(self) -> Supervisor {
        Supervisor::new_internal(self.cfg, self.backend, self.termination)
    }
}
