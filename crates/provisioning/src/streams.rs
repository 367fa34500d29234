//! Stream broadcast planning.

use tracing::{debug, info, instrument};

use contracts::{
    BridgeError, BroadcastId, BroadcastRequest, DeviceCommand, DeviceLink, StreamSettings,
};

/// Computes and applies the set of broadcast requests that realize the
/// configured streams on the device.
///
/// Two rules beyond a straight mapping:
/// - GPS navigation is always requested, enabled or not, because time
///   synchronization depends on it.
/// - When two streams share an underlying broadcast (the INS odometry
///   composition consumes the dual-IMU dataset), the shared broadcast runs
///   at the higher of the requested rates.
pub struct StreamController {
    streams: StreamSettings,
}

impl StreamController {
    pub fn new(streams: StreamSettings) -> Self {
        Self { streams }
    }

    /// The deduplicated broadcast plan for the configured streams
    pub fn broadcast_plan(&self) -> Vec<BroadcastRequest> {
        let mut plan: Vec<BroadcastRequest> = Vec::new();
        let s = &self.streams;

        if s.ins.enabled {
            let period = s.ins.period_ms();
            merge(&mut plan, BroadcastId::Ins1, period);
            merge(&mut plan, BroadcastId::Ins2, period);
            merge(&mut plan, BroadcastId::InsVariance, period);
            // Odometry needs angular rates, so INS pulls the IMU dataset too
            merge(&mut plan, BroadcastId::DualImu, period);
        }

        if s.imu.enabled {
            merge(&mut plan, BroadcastId::DualImu, s.imu.period_ms());
        }

        // Always requested: the timebase needs the time-of-week offset
        merge(&mut plan, BroadcastId::GpsNav, s.gps.period_ms());

        if s.gps_info.enabled {
            merge(&mut plan, BroadcastId::GpsSatInfo, s.gps_info.period_ms());
        }

        if s.magnetometer.enabled {
            let period = s.magnetometer.period_ms();
            merge(&mut plan, BroadcastId::Magnetometer1, period);
            merge(&mut plan, BroadcastId::Magnetometer2, period);
        }

        if s.barometer.enabled {
            merge(&mut plan, BroadcastId::Barometer, s.barometer.period_ms());
        }

        if s.preint_imu.enabled {
            merge(&mut plan, BroadcastId::PreintImu, s.preint_imu.period_ms());
        }

        plan
    }

    /// Send the broadcast plan over the link
    ///
    /// Returns the number of requests written. Does not retry; transport
    /// errors propagate to the caller.
    #[instrument(name = "stream_controller_apply", skip(self, link))]
    pub fn apply<L: DeviceLink>(&self, link: &mut L) -> Result<usize, BridgeError> {
        let plan = self.broadcast_plan();
        for request in &plan {
            debug!(id = ?request.id, period_ms = request.period_ms, "requesting broadcast");
            link.send(&DeviceCommand::SetBroadcastRate(*request))?;
        }
        info!(requests = plan.len(), "broadcast plan applied");
        Ok(plan.len())
    }
}

/// Insert a request, keeping the smaller period (higher rate) on conflict
fn merge(plan: &mut Vec<BroadcastRequest>, id: BroadcastId, period_ms: u32) {
    match plan.iter_mut().find(|r| r.id == id) {
        Some(existing) => existing.period_ms = existing.period_ms.min(period_ms),
        None => plan.push(BroadcastRequest { id, period_ms }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamToggle;
    use device_link::MockLink;

    fn period_of(plan: &[BroadcastRequest], id: BroadcastId) -> Option<u32> {
        plan.iter().find(|r| r.id == id).map(|r| r.period_ms)
    }

    #[test]
    fn gps_always_requested() {
        let mut streams = StreamSettings::default();
        streams.ins = StreamToggle::new(false, 100);
        streams.imu = StreamToggle::new(false, 100);
        streams.gps = StreamToggle::new(false, 10);
        streams.gps_info = StreamToggle::new(false, 10);
        streams.magnetometer = StreamToggle::new(false, 100);
        streams.barometer = StreamToggle::new(false, 100);

        let plan = StreamController::new(streams).broadcast_plan();
        assert_eq!(period_of(&plan, BroadcastId::GpsNav), Some(100));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn shared_dual_imu_takes_higher_rate() {
        let mut streams = StreamSettings::default();
        streams.ins = StreamToggle::new(true, 50);
        streams.imu = StreamToggle::new(true, 100);

        let plan = StreamController::new(streams).broadcast_plan();
        // 100 Hz wins over 50 Hz: period 10 ms
        assert_eq!(period_of(&plan, BroadcastId::DualImu), Some(10));
    }

    #[test]
    fn shared_dual_imu_takes_ins_rate_when_faster() {
        let mut streams = StreamSettings::default();
        streams.ins = StreamToggle::new(true, 200);
        streams.imu = StreamToggle::new(true, 100);

        let plan = StreamController::new(streams).broadcast_plan();
        assert_eq!(period_of(&plan, BroadcastId::DualImu), Some(5));
    }

    #[test]
    fn no_duplicate_requests() {
        let plan = StreamController::new(StreamSettings::default()).broadcast_plan();
        for request in &plan {
            let count = plan.iter().filter(|r| r.id == request.id).count();
            assert_eq!(count, 1, "duplicate request for {:?}", request.id);
        }
    }

    #[test]
    fn disabled_streams_are_absent() {
        let streams = StreamSettings::default();
        assert!(!streams.preint_imu.enabled);

        let plan = StreamController::new(streams).broadcast_plan();
        assert!(period_of(&plan, BroadcastId::PreintImu).is_none());
    }

    #[test]
    fn apply_writes_every_request() {
        let controller = StreamController::new(StreamSettings::default());
        let mut link = MockLink::new();

        let sent = controller.apply(&mut link).unwrap();
        assert_eq!(sent, controller.broadcast_plan().len());
        assert_eq!(link.sent_commands().len(), sent);
    }
}
