//! Bridge metric collection
//!
//! Gauges and counters recorded from the run loop, plus an in-memory
//! aggregator for end-of-run summaries.

use metrics::{counter, gauge, histogram};

/// Record the timebase state
///
/// Call periodically from the run loop; the offset gauge is only meaningful
/// before GPS anchoring.
pub fn record_clock_state(local_offset_s: f64, gps_anchored: bool) {
    gauge!("ins_bridge_gps_anchored").set(if gps_anchored { 1.0 } else { 0.0 });
    if !gps_anchored {
        gauge!("ins_bridge_local_offset_seconds").set(local_offset_s);
        histogram!("ins_bridge_local_offset_seconds_hist").record(local_offset_s);
    }
}

/// Record the terminal handshake result ("confirmed" / "degraded" / "timeout")
pub fn record_handshake_result(outcome: &str) {
    counter!(
        "ins_bridge_handshake_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Dispatch metrics aggregator
///
/// Aggregates counters in memory for end-of-run summary output.
#[derive(Debug, Clone, Default)]
pub struct DispatchAggregator {
    /// Records consumed from the decoder
    pub records_received: u64,

    /// Telemetry records published
    pub records_published: u64,

    /// Sensor records dropped before arming
    pub dropped_unarmed: u64,

    /// Unparsed byte runs
    pub unparsed: u64,

    /// Unhandled dataset ids
    pub unknown: u64,

    /// Whether the timebase ended GPS-anchored
    pub gps_anchored: bool,

    /// Local offset samples observed before anchoring
    pub offset_stats: RunningStats,
}

impl DispatchAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cumulative dispatch counters
    pub fn set_counts(
        &mut self,
        received: u64,
        published: u64,
        dropped_unarmed: u64,
        unparsed: u64,
        unknown: u64,
    ) {
        self.records_received = received;
        self.records_published = published;
        self.dropped_unarmed = dropped_unarmed;
        self.unparsed = unparsed;
        self.unknown = unknown;
    }

    /// Observe the timebase state
    pub fn observe_clock(&mut self, local_offset_s: f64, gps_anchored: bool) {
        self.gps_anchored = gps_anchored;
        if !gps_anchored {
            self.offset_stats.push(local_offset_s);
        }
    }

    /// Generate a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            records_received: self.records_received,
            records_published: self.records_published,
            dropped_unarmed: self.dropped_unarmed,
            unparsed: self.unparsed,
            unknown: self.unknown,
            gps_anchored: self.gps_anchored,
            publish_rate: if self.records_received > 0 {
                self.records_published as f64 / self.records_received as f64 * 100.0
            } else {
                0.0
            },
            local_offset_s: StatsSummary::from(&self.offset_stats),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub records_received: u64,
    pub records_published: u64,
    pub dropped_unarmed: u64,
    pub unparsed: u64,
    pub unknown: u64,
    pub gps_anchored: bool,
    pub publish_rate: f64,
    pub local_offset_s: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Records received: {}", self.records_received)?;
        writeln!(
            f,
            "Records published: {} ({:.2}%)",
            self.records_published, self.publish_rate
        )?;
        writeln!(f, "Dropped before arming: {}", self.dropped_unarmed)?;
        writeln!(f, "Unparsed byte runs: {}", self.unparsed)?;
        writeln!(f, "Unknown dataset ids: {}", self.unknown)?;
        writeln!(
            f,
            "Timebase: {}",
            if self.gps_anchored {
                "GPS-anchored"
            } else {
                "local estimate"
            }
        )?;
        writeln!(f, "Local offset (s): {}", self.local_offset_s)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_observe_clock() {
        let mut aggregator = DispatchAggregator::new();

        aggregator.observe_clock(4990.5, false);
        aggregator.observe_clock(4990.6, false);
        assert_eq!(aggregator.offset_stats.count(), 2);

        // Once anchored, offset samples stop accumulating
        aggregator.observe_clock(4990.7, true);
        assert_eq!(aggregator.offset_stats.count(), 2);
        assert!(aggregator.gps_anchored);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchAggregator::new();
        aggregator.set_counts(100, 80, 15, 3, 2);
        aggregator.observe_clock(1.0, true);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Records received: 100"));
        assert!(output.contains("80.00%"));
        assert!(output.contains("GPS-anchored"));
    }
}
