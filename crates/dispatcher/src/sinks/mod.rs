//! Sink implementations
//!
//! Contains LogSink, JsonlSink, and NetworkSink.

mod jsonl;
mod log;
mod network;

pub use self::jsonl::JsonlSink;
pub use self::log::LogSink;
pub use self::network::NetworkSink;
