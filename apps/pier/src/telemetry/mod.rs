//! Tracing setup for the `pier` binary.
//!
//! Without `--log-file`, records go to stderr through a [`Gate`] so that an
//! exec session can take the terminal with [`hold_terminal`] and get the
//! parked records back once raw mode is over.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;

mod filter;
mod gate;

pub use filter::{Directives, FILTER_ENV, TRACE_DEPS_ENV};
pub use gate::{BACKLOG_LIMIT, Gate, GatedStderr, TerminalLease};

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Log file; stderr (gated) when unset.
    pub file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static STDERR_GATE: Gate = Gate::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static INSTALLED: OnceLock<()> = OnceLock::new();

/// Keeps stderr log records off the terminal until the lease is dropped.
/// Records written to a log file are unaffected.
pub fn hold_terminal() -> TerminalLease<'static> {
    STDERR_GATE.hold()
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let directives = Directives::resolve(config.level, |key| std::env::var(key).ok());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(directives.to_filter())
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_ids(config.level == LogLevel::Trace);

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| InitError::Io {
                    path: path.clone(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            builder.with_ansi(false).with_writer(writer).try_init()
        }
        None => builder
            .with_ansi(io::stderr().is_terminal())
            .with_writer(GatedStderr::new(&STDERR_GATE))
            .try_init(),
    };
    installed.map_err(|err| InitError::Configure(err.to_string()))?;
    let _ = INSTALLED.set(());

    tracing::debug!(
        target: "pier::telemetry",
        directives = %directives.text,
        quiet_deps = directives.quiet_deps,
        file = ?config.file,
        "logging initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_matches_verbosity() {
        assert!(LogLevel::Trace > LogLevel::Debug);
        assert!(LogLevel::Warn > LogLevel::Error);
        assert_eq!(LogLevel::default().as_str(), "warn");
    }

    #[test]
    fn process_gate_is_released_by_the_lease() {
        let lease = hold_terminal();
        assert!(STDERR_GATE.is_held());
        assert_eq!(lease.release_into(&mut Vec::new()), 0);
        assert!(!STDERR_GATE.is_held());
    }
}
