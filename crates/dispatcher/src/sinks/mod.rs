//! Sink implementations

mod file;
mod http;
mod log;

pub use file::{FileSink, FileSinkConfig, LATEST_FILE};
pub use http::HttpTelemetrySink;
pub use log::LogSink;
