//! Logging infrastructure for Checkwise.
//!
//! This module provides structured logging using the tracing ecosystem.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events are enabled by the default filter.
const LOGGED_CRATES: [&str; 3] = ["cw_core", "cw_cli", "checkwise"];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level name (trace, debug, info, warn, error).
    pub level: String,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_spans: false,
            include_location: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            include_spans: true,
            include_location: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            include_spans: false,
            include_location: false,
            include_target: true,
        }
    }

    /// Parses the configured level, falling back to INFO for unknown names.
    pub fn parsed_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }

    /// Builds the default directive string used when `RUST_LOG` is unset.
    pub fn filter_directives(&self) -> String {
        let level = self.parsed_level();
        LOGGED_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(&LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is a no-op after the first successful initialization.
pub fn init_logging_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    }
}

/// Creates a span for an integrity check run.
#[macro_export]
macro_rules! integrity_span {
    ($run_id:expr) => {
        tracing::info_span!("integrity_check", run_id = %$run_id)
    };
    ($run_id:expr, $($field:tt)*) => {
        tracing::info_span!("integrity_check", run_id = %$run_id, $($field)*)
    };
}

/// Creates a span for a repair run.
#[macro_export]
macro_rules! repair_span {
    ($run_id:expr, $issue_count:expr) => {
        tracing::info_span!("integrity_repair", run_id = %$run_id, issues = $issue_count)
    };
}
