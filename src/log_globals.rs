//! Global log stream instances.
//!
//! One stream per execution context, one drain in the foreground.

use crate::logging::LogStream;

/// Log stream written from the receive interrupt path.
pub static ISR_LOG_STREAM: LogStream = LogStream::new();

/// Log stream written from the foreground loop.
pub static MAIN_LOG_STREAM: LogStream = LogStream::new();
