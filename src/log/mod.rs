//! # Logging setup.
//!
//! [`LogOptions`] carries the `--log.*` flags (also loadable from JSON/serde) and
//! installs the global `tracing` subscriber with [`LogOptions::build`].
//!
//! ```text
//! LogOptions ──validate()──► Vec<LogOptionsError>   (reported before anything starts)
//!      │
//!      ├──complete()──► normalised output paths
//!      │
//!      └──build()──► registry
//!                      ├─ EnvFilter  (level + RUST_LOG directives)
//!                      └─ fmt layer  (console | pretty | json)
//!                           └─ writer: outputs (below ERROR) ⊕ error-outputs (ERROR)
//! ```

mod options;

pub use options::{LogOptions, LogOptionsError};
