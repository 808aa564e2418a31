//! Sink implementations
//!
//! Contains CsvSink and LogSink.

mod csv;
mod log;

pub use self::csv::{CsvSink, CsvSinkConfig};
pub use self::log::LogSink;
