//! TelemetryFanout - fan-out of published records to sinks

use tracing::{debug, info, instrument};

use contracts::{SinkConfig, SinkType, TelemetryRecord};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{JsonlSink, LogSink, NetworkSink};

/// Fans published records out to all configured sinks
///
/// Each sink runs on its own worker task with an isolated bounded queue;
/// a slow sink drops its own records instead of stalling the ingest path.
pub struct TelemetryFanout {
    handles: Vec<SinkHandle>,
}

impl TelemetryFanout {
    /// Fanout with no sinks (records are counted and discarded)
    pub fn empty() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Create a fanout with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self { handles }
    }

    /// Number of attached sinks
    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Non-blocking hand-off of one record to every sink
    pub fn publish(&self, record: &TelemetryRecord) {
        for handle in &self.handles {
            handle.try_send(record.clone());
        }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Shut down all sink workers, flushing queued records
    #[instrument(name = "fanout_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
        debug!("fanout shutdown complete");
    }
}

/// Build a fanout from sink configurations
#[instrument(name = "fanout_create", skip(sink_configs), fields(sinks = sink_configs.len()))]
pub async fn create_fanout(sink_configs: &[SinkConfig]) -> Result<TelemetryFanout, DispatcherError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in sink_configs {
        handles.push(create_sink_handle(config).await?);
    }
    info!(sinks = handles.len(), "telemetry fanout ready");
    Ok(TelemetryFanout { handles })
}

/// Create a SinkHandle from configuration
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Jsonl => {
            let sink = JsonlSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BaroRecord, Header, Timestamp};
    use std::collections::HashMap;

    fn record() -> TelemetryRecord {
        TelemetryRecord::Barometer(BaroRecord {
            header: Header {
                stamp: Timestamp::new(1, 0),
                frame_id: "body".to_string(),
            },
            fluid_pressure: 100.0,
        })
    }

    #[tokio::test]
    async fn test_fanout_to_multiple_sinks() {
        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ];
        let fanout = TelemetryFanout::with_handles(handles);

        for _ in 0..5 {
            fanout.publish(&record());
        }

        fanout.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_fanout_from_config() {
        let configs = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let fanout = create_fanout(&configs).await.unwrap();
        assert_eq!(fanout.sink_count(), 1);

        fanout.publish(&record());
        fanout.shutdown().await;
    }

    #[test]
    fn empty_fanout_discards() {
        let fanout = TelemetryFanout::empty();
        fanout.publish(&record());
        assert_eq!(fanout.sink_count(), 0);
    }
}
