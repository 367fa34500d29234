//! Pipeline run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DispatchAggregator;

/// Statistics from one bridge run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Records consumed from the decoder
    pub records_received: u64,

    /// Telemetry records published to sinks
    pub records_published: u64,

    /// Sensor records dropped before arming
    pub dropped_unarmed: u64,

    /// Unparsed byte runs forwarded as diagnostics
    pub unparsed: u64,

    /// Unhandled dataset ids
    pub unknown: u64,

    /// Terminal handshake outcome ("confirmed" / "degraded")
    pub handshake_outcome: String,

    /// Total duration of the run
    pub duration: Duration,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Per-sink write/drop counters
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,

    /// Dispatch metrics aggregator
    pub dispatch_metrics: DispatchAggregator,
}

impl RunStats {
    /// Published records per second
    pub fn records_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Bridge Run Statistics ===\n");

        println!("Overview");
        println!("   duration: {:.2}s", self.duration.as_secs_f64());
        println!("   handshake: {}", self.handshake_outcome);
        println!("   records received: {}", self.records_received);
        println!("   records published: {}", self.records_published);
        println!("   records/s: {:.2}", self.records_per_second());
        println!("   active sinks: {}", self.active_sinks);

        println!("\n{}", self.dispatch_metrics.summary());

        if !self.sink_metrics.is_empty() {
            println!("Sinks");
            for (name, snapshot) in &self.sink_metrics {
                println!(
                    "   {}: written={} failed={} dropped={}",
                    name, snapshot.write_count, snapshot.failure_count, snapshot.dropped_count
                );
            }
        }

        println!();
    }
}
