//! # cw-observability
//!
//! Logging infrastructure for Checkwise.
//!
//! This crate sets up structured logging with tracing and provides the span
//! macros used around integrity check and repair runs.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
