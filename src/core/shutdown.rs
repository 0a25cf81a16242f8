//! # Termination trap: the external shutdown request.
//!
//! [`TerminationTrap`] installs the process signal listeners up front, so a
//! registration failure is reported during startup instead of surfacing mid-run.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! [`Termination`] wraps either the trap or a caller-provided future, so embedders
//! and tests can drive shutdown without signals.

use futures::future::BoxFuture;

/// Registered process signal listeners.
pub struct TerminationTrap {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl TerminationTrap {
    /// Registers listeners for the termination signals.
    ///
    /// Each call creates independent listeners.
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// Registers listeners for the termination signals.
    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next termination signal and returns its name.
    #[cfg(unix)]
    pub async fn triggered(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv()  => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }

    /// Waits for the next termination signal and returns its name.
    #[cfg(not(unix))]
    pub async fn triggered(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "ctrl-c listener failed; termination only via stream exhaustion"
                );
                std::future::pending::<&'static str>().await
            }
        }
    }
}

/// Source of the termination event observed by the supervisor.
pub enum Termination {
    /// Process signals.
    Signals(TerminationTrap),
    /// Caller-provided one-shot future.
    External(BoxFuture<'static, ()>),
}

impl Termination {
    /// Waits for the termination event and returns a short description of its cause.
    pub async fn requested(&mut self) -> &'static str {
        match self {
            Termination::Signals(trap) => trap.triggered().await,
            Termination::External(fut) => {
                fut.await;
                "external"
            }
        }
    }
}
