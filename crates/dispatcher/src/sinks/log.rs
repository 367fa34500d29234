//! LogSink - logs record summaries via tracing

use contracts::{BridgeError, TelemetryRecord, TelemetrySink};
use tracing::{info, instrument};

/// Sink that logs record summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record_summary(&self, record: &TelemetryRecord) {
        let header = record.header();
        info!(
            sink = %self.name,
            record = record.tag(),
            stamp = header.stamp.as_secs_f64(),
            frame = %header.frame_id,
            "telemetry record received"
        );
    }
}

impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, record = record.tag())
    )]
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), BridgeError> {
        self.log_record_summary(record);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), BridgeError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), BridgeError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BaroRecord, Header, Timestamp};

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let record = TelemetryRecord::Barometer(BaroRecord {
            header: Header {
                stamp: Timestamp::new(1, 0),
                frame_id: "body".to_string(),
            },
            fluid_pressure: 101.3,
        });

        let result = sink.write(&record).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
