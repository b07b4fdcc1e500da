use tracing_subscriber::EnvFilter;

use super::LogLevel;
use crate::config::parse_flag;

/// Full `EnvFilter` directive string; replaces the level-derived default.
pub const FILTER_ENV: &str = "PIER_LOG_FILTER";
/// Lets dependencies log at the requested debug/trace level too.
pub const TRACE_DEPS_ENV: &str = "PIER_TRACE_DEPS";

/// Targets emitted by this workspace.
const OWN_TARGETS: &[&str] = &["pier", "pier_client_core", "grpc_web", "grpc_web_codec"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
    pub text: String,
    /// Dependencies were held at `warn` while pier itself is verbose.
    pub quiet_deps: bool,
}

impl Directives {
    pub fn for_level(level: LogLevel, trace_deps: bool) -> Self {
        match level {
            LogLevel::Debug | LogLevel::Trace if !trace_deps => {
                let own = OWN_TARGETS
                    .iter()
                    .map(|target| format!("{target}={}", level.as_str()));
                let text = std::iter::once("warn".to_string())
                    .chain(own)
                    .collect::<Vec<_>>()
                    .join(",");
                Self {
                    text,
                    quiet_deps: true,
                }
            }
            _ => Self {
                text: level.as_str().to_string(),
                quiet_deps: false,
            },
        }
    }

    /// Reads the override variables through `lookup`.
    pub fn resolve<F>(level: LogLevel, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(FILTER_ENV).filter(|value| !value.trim().is_empty()) {
            Some(text) => Self {
                text,
                quiet_deps: false,
            },
            None => {
                let trace_deps = lookup(TRACE_DEPS_ENV).is_some_and(|value| parse_flag(&value));
                Self::for_level(level, trace_deps)
            }
        }
    }

    pub fn to_filter(&self) -> EnvFilter {
        EnvFilter::new(&self.text)
    }
}
