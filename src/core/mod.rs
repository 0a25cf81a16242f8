//! Runtime core: orchestration and lifecycle.
//!
//! The public entry point is [`Supervisor`], which starts one subscriber per topic,
//! waits for exhaustion or termination, and drains everything it started.
//!
//! Internal modules:
//! - [`supervisor`]: state machine, startup, the exhaustion/termination race, drain;
//! - [`builder`]: assembles a supervisor from config, backend and optional termination source;
//! - [`completion`]: counts live receive loops and resolves when none remain;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`config`]: supervisor settings.

mod builder;
mod completion;
mod config;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use completion::{CompletionGuard, CompletionToken};
pub use config::SupervisorConfig;
pub use supervisor::{StopReason, Supervisor, SupervisorState};
