//! TelemetrySink trait - publisher interface
//!
//! Defines the abstract interface for sinks.

use crate::{BridgeError, TelemetryRecord};

/// Telemetry output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(TelemetrySink: Send)]
pub trait LocalTelemetrySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one published record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), BridgeError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), BridgeError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), BridgeError>;
}
