//! # Loggers Module
//!
//! Process-wide `tracing` subscriber setup for the binaries. Library code only
//! emits events; installing the subscriber is left to whoever hosts it.

/// Console plus rotating file subscriber.
pub mod logger_setup;

pub use logger_setup::setup_logging;
