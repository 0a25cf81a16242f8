//! # Log options.
//!
//! The `--log.*` option set, its validation and the installation of the global
//! `tracing` subscriber built from it.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Arc;

use clap::Args;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, Metadata};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const CONSOLE_FORMAT: &str = "console";
const JSON_FORMAT: &str = "json";

/// Errors produced while validating or installing [`LogOptions`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogOptionsError {
    /// Level text is not a known level.
    #[error("unrecognized level: {0:?}")]
    Level(String),
    /// Format is neither `console` nor `json`.
    #[error("not a valid log format: {0:?}")]
    Format(String),
    /// An output path could not be opened.
    #[error("cannot open log output {path:?}: {source}")]
    Output {
        path: String,
        #[source]
        source: io::Error,
    },
    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

impl LogOptionsError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LogOptionsError::Level(_) => "log_invalid_level",
            LogOptionsError::Format(_) => "log_invalid_format",
            LogOptionsError::Output { .. } => "log_output_failed",
            LogOptionsError::Install(_) => "log_install_failed",
        }
    }
}

/// Logging configuration.
///
/// Field names serialize in kebab-case; every field is also a `--log.<name>` flag.
#[derive(Args, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LogOptions {
    /// Output paths of log (`stdout`, `stderr` or a file).
    #[arg(long = "log.output-paths", value_delimiter = ',', default_value = "stdout")]
    pub output_paths: Vec<String>,

    /// Error output paths of log; ERROR events are written there instead of the output paths.
    #[arg(long = "log.error-output-paths", value_delimiter = ',', default_value = "stderr")]
    pub error_output_paths: Vec<String>,

    /// Minimum log output LEVEL.
    #[arg(long = "log.level", value_name = "LEVEL", default_value = "info")]
    pub level: String,

    /// Log output FORMAT, console or json.
    #[arg(long = "log.format", value_name = "FORMAT", default_value = CONSOLE_FORMAT)]
    pub format: String,

    /// Disable output of caller information in the log.
    #[arg(long = "log.disable-caller")]
    pub disable_caller: bool,

    /// Disable the panic hook that logs a backtrace.
    #[arg(long = "log.disable-stacktrace")]
    pub disable_stacktrace: bool,

    /// Enable output ansi colors in console format logs.
    #[arg(long = "log.enable-color")]
    pub enable_color: bool,

    /// Development mode: pretty multi-line console output with thread ids.
    #[arg(long = "log.development")]
    pub development: bool,

    /// The name of the logger.
    #[arg(long = "log.name", default_value = "")]
    pub name: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            output_paths: vec!["stdout".to_string()],
            error_output_paths: vec!["stderr".to_string()],
            level: "info".to_string(),
            format: CONSOLE_FORMAT.to_string(),
            disable_caller: false,
            disable_stacktrace: false,
            enable_color: false,
            development: false,
            name: String::new(),
        }
    }
}

/// Parses level text the way the `--log.level` flag accepts it.
///
/// `dpanic`, `panic` and `fatal` map to ERROR: tracing has no higher level.
fn parse_level(text: &str) -> Option<Level> {
    match text.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" | "" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "dpanic" | "panic" | "fatal" => Some(Level::ERROR),
        _ => None,
    }
}

fn fix_windows_path(path: &str) -> String {
    let trimmed = match path.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &path[1..],
        _ => path,
    };
    trimmed.replace('/', "\\")
}

impl LogOptions {
    /// Checks the options and returns every problem found.
    pub fn validate(&self) -> Vec<LogOptionsError> {
        let mut errs = Vec::new();
        if parse_level(&self.level).is_none() {
            errs.push(LogOptionsError::Level(self.level.clone()));
        }
        let format = self.format.to_ascii_lowercase();
        if format != CONSOLE_FORMAT && format != JSON_FORMAT {
            errs.push(LogOptionsError::Format(self.format.clone()));
        }
        errs
    }

    /// Normalises `.log` file paths for the host platform.
    pub fn complete(&mut self) {
        self.complete_for(cfg!(windows));
    }

    fn complete_for(&mut self, windows: bool) {
        if !windows {
            return;
        }
        for path in self
            .output_paths
            .iter_mut()
            .chain(self.error_output_paths.iter_mut())
        {
            if path.ends_with(".log") {
                *path = fix_windows_path(path);
            }
        }
    }

    fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case(JSON_FORMAT)
    }

    /// Root span named after the logger; disabled when no name is set.
    pub fn root_span(&self) -> tracing::Span {
        if self.name.is_empty() {
            tracing::Span::none()
        } else {
            tracing::info_span!("logger", name = %self.name)
        }
    }

    /// Installs the global subscriber.
    ///
    /// An unparseable level falls back to `info`; `RUST_LOG` directives are added on top.
    pub fn build(&self) -> Result<(), LogOptionsError> {
        let level = parse_level(&self.level).unwrap_or(Level::INFO);
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy();

        let writer = route_writers(&self.output_paths, &self.error_output_paths)?;

        let caller = !self.disable_caller;
        let json = self.is_json();
        let base = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_file(caller)
            .with_line_number(caller)
            .with_ansi(!json && self.enable_color);
        let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
            base.json().boxed()
        } else if self.development {
            base.pretty().with_thread_ids(true).boxed()
        } else {
            base.boxed()
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .map_err(|e| LogOptionsError::Install(e.to_string()))?;

        if !self.disable_stacktrace {
            install_panic_hook();
        }
        Ok(())
    }
}

impl fmt::Display for LogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&data)
    }
}

/// Which events a writer receives.
type Route = fn(&Metadata<'_>) -> bool;

fn every_event(_: &Metadata<'_>) -> bool {
    true
}

fn below_error(meta: &Metadata<'_>) -> bool {
    *meta.level() != Level::ERROR
}

fn error_only(meta: &Metadata<'_>) -> bool {
    *meta.level() == Level::ERROR
}

/// Combines both output sets into one writer.
///
/// ERROR events go to the error outputs only; every other event goes to the outputs.
/// With no error outputs configured, the outputs receive everything.
fn route_writers(
    outputs: &[String],
    error_outputs: &[String],
) -> Result<BoxMakeWriter, LogOptionsError> {
    let main_route: Route = if error_outputs.is_empty() {
        every_event
    } else {
        below_error
    };
    let main = open_writers(outputs, main_route)?;
    let errors = open_writers(error_outputs, error_only)?;
    Ok(match (main, errors) {
        (Some(main), Some(errors)) => BoxMakeWriter::new(main.and(errors)),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => BoxMakeWriter::new(io::sink),
    })
}

/// Opens every path and tees them into one writer receiving the events `route` accepts.
fn open_writers(paths: &[String], route: Route) -> Result<Option<BoxMakeWriter>, LogOptionsError> {
    let mut out: Option<BoxMakeWriter> = None;
    for path in paths {
        let next = BoxMakeWriter::new(open_writer(path)?.with_filter(route));
        out = Some(match out {
            Some(prev) => BoxMakeWriter::new(prev.and(next)),
            None => next,
        });
    }
    Ok(out)
}

fn open_writer(path: &str) -> Result<BoxMakeWriter, LogOptionsError> {
    match path {
        "stdout" => Ok(BoxMakeWriter::new(io::stdout)),
        "stderr" => Ok(BoxMakeWriter::new(io::stderr)),
        _ => {
            let file: File = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogOptionsError::Output {
                    path: path.to_string(),
                    source,
                })?;
            Ok(BoxMakeWriter::new(Arc::new(file)))
        }
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!(panic = %info, %backtrace, "panic");
    }));
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        log: LogOptions,
    }

    #[test]
    fn defaults_match_flags() {
        let cli = Cli::try_parse_from(["bin"]).unwrap();
        assert_eq!(cli.log, LogOptions::default());
        assert!(cli.log.validate().is_empty());
    }

    #[test]
    fn flags_parse_with_log_prefix() {
        let cli = Cli::try_parse_from([
            "bin",
            "--log.level",
            "debug",
            "--log.format",
            "json",
            "--log.output-paths",
            "stdout,/tmp/a.log",
            "--log.disable-caller",
            "--log.name",
            "datasync",
        ])
        .unwrap();
        assert_eq!(cli.log.level, "debug");
        assert_eq!(cli.log.format, "json");
        assert_eq!(cli.log.output_paths, vec!["stdout", "/tmp/a.log"]);
        assert!(cli.log.disable_caller);
        assert_eq!(cli.log.name, "datasync");
    }

    #[test]
    fn validate_reports_every_problem() {
        let opts = LogOptions {
            level: "loud".into(),
            format: "xml".into(),
            ..LogOptions::default()
        };
        let errs = opts.validate();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].as_label(), "log_invalid_level");
        assert_eq!(errs[1].as_label(), "log_invalid_format");
    }

    #[test]
    fn level_aliases_are_accepted() {
        for text in ["WARNING", "dpanic", "Fatal", "panic", "trace"] {
            assert!(parse_level(text).is_some(), "{text}");
        }
        assert_eq!(parse_level("fatal"), Some(Level::ERROR));
        assert_eq!(parse_level("nope"), None);
    }

    #[test]
    fn display_renders_kebab_case_json() {
        let text = LogOptions::default().to_string();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["output-paths"], serde_json::json!(["stdout"]));
        assert_eq!(value["disable-caller"], serde_json::json!(false));
        assert_eq!(value["level"], "info");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let opts: LogOptions = serde_json::from_str(r#"{"level":"warn"}"#).unwrap();
        assert_eq!(opts.level, "warn");
        assert_eq!(opts.error_output_paths, vec!["stderr"]);
    }

    #[test]
    fn complete_rewrites_only_log_files_on_windows() {
        let mut opts = LogOptions {
            output_paths: vec!["stdout".into(), "/C:/var/app.log".into()],
            error_output_paths: vec!["logs/err.log".into(), "logs/err.txt".into()],
            ..LogOptions::default()
        };
        let untouched = opts.clone();
        opts.complete_for(false);
        assert_eq!(opts, untouched);

        opts.complete_for(true);
        assert_eq!(opts.output_paths, vec!["stdout", "C:\\var\\app.log"]);
        assert_eq!(opts.error_output_paths, vec!["logs\\err.log", "logs/err.txt"]);
    }

    #[test]
    fn unopenable_output_is_reported() {
        let err = open_writer("/nonexistent-dir/sub/app.log").err().unwrap();
        assert_eq!(err.as_label(), "log_output_failed");
    }

    fn scratch(name: &str) -> String {
        let path = std::env::temp_dir().join(format!("datasync-{}-{name}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path.to_string_lossy().into_owned()
    }

    fn emit_both(writer: BoxMakeWriter) {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("plain line");
            tracing::error!("broken line");
        });
    }

    #[test]
    fn error_events_go_only_to_error_outputs() {
        let out = scratch("route-out.log");
        let err = scratch("route-err.log");
        emit_both(route_writers(&[out.clone()], &[err.clone()]).unwrap());

        let out_text = std::fs::read_to_string(&out).unwrap();
        let err_text = std::fs::read_to_string(&err).unwrap();
        assert!(out_text.contains("plain line"));
        assert!(!out_text.contains("broken line"));
        assert!(err_text.contains("broken line"));
        assert!(!err_text.contains("plain line"));
    }

    #[test]
    fn outputs_keep_errors_without_error_outputs() {
        let out = scratch("solo-out.log");
        emit_both(route_writers(&[out.clone()], &[]).unwrap());

        let out_text = std::fs::read_to_string(&out).unwrap();
        assert!(out_text.contains("plain line"));
        assert!(out_text.contains("broken line"));
    }

    #[test]
    fn root_span_is_disabled_without_name() {
        assert!(LogOptions::default().root_span().is_none());
    }
}
