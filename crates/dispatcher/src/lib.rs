//! # Dispatcher
//!
//! Message routing and telemetry publication.
//!
//! Responsibilities:
//! - Route decoded `MessageRecord`s to per-type handlers
//! - Enforce the armed precondition (handshake complete) before sensor
//!   records are processed; handshake-class records always pass
//! - Resolve timestamps through the timebase and compose cross-message
//!   state (`DispatchContext`) into published records
//! - Fan out `TelemetryRecord`s to sinks, isolating slow sinks from the
//!   ingest path

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{TelemetryRecord, TelemetrySink};
pub use context::DispatchContext;
pub use dispatcher::{DispatchStats, MessageDispatcher};
pub use error::DispatcherError;
pub use fanout::{create_fanout, TelemetryFanout};
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{JsonlSink, LogSink, NetworkSink};
