//! MessageDispatcher - per-type routing of decoded records.

use bytes::Bytes;
use tracing::{debug, info, instrument, trace, warn};

use contracts::{
    BaroRecord, BarometerData, DeviceCommand, DiagnosticRecord, DualImuData, FlashConfigData,
    FlashField, FlashKey, FlashValue, GpsInfoRecord, GpsNavData, GpsRecord, GpsSatInfoData, Header,
    ImuRecord, Ins1Data, Ins2Data, InsVarianceData, MagRecord, MagnetometerData, MessageRecord,
    OdometryRecord, PreintImuData, PreintImuRecord, RecordIngest, SensorUnit, StreamSettings,
    StrobeInTimeData, StrobeRecord, TelemetryRecord, Timestamp,
};
use timebase::{timestamp_from_week_tow, ClockSynchronizer, FixTracker, SystemClock, WallClock};

use crate::fanout::TelemetryFanout;

/// Counters for one dispatcher session
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    /// Records consumed from the decoder
    pub received: u64,

    /// Telemetry records handed to the fanout
    pub published: u64,

    /// Sensor records dropped because the bridge was not yet armed
    pub dropped_unarmed: u64,

    /// Unparsed byte runs forwarded on the diagnostic path
    pub unparsed: u64,

    /// Records with an unhandled dataset id
    pub unknown: u64,
}

/// Routes decoded records to handlers and publishes synchronized telemetry
///
/// Owns all cross-message state: the clock synchronizer, the GPS fix latch,
/// the flash-config snapshot and the [`DispatchContext`](crate::DispatchContext).
/// Driven from a single logical thread; no locking.
pub struct MessageDispatcher<C: WallClock = SystemClock> {
    clock: ClockSynchronizer<C>,
    fix: FixTracker,
    armed: bool,
    frame_id: String,
    streams: StreamSettings,
    auto_ref_lla: bool,
    flash: Option<FlashConfigData>,
    flash_generation: u64,
    context: crate::DispatchContext,
    fanout: TelemetryFanout,
    pending_commands: Vec<DeviceCommand>,
    stats: DispatchStats,
}

impl MessageDispatcher<SystemClock> {
    /// Create a dispatcher on the system wall clock
    pub fn new(
        frame_id: impl Into<String>,
        streams: StreamSettings,
        auto_ref_lla: bool,
        fanout: TelemetryFanout,
    ) -> Self {
        Self::with_clock(SystemClock, frame_id, streams, auto_ref_lla, fanout)
    }
}

impl<C: WallClock> MessageDispatcher<C> {
    /// Create a dispatcher with an injected wall clock (tests)
    pub fn with_clock(
        wall: C,
        frame_id: impl Into<String>,
        streams: StreamSettings,
        auto_ref_lla: bool,
        fanout: TelemetryFanout,
    ) -> Self {
        Self {
            clock: ClockSynchronizer::new(wall),
            fix: FixTracker::new(),
            armed: false,
            frame_id: frame_id.into(),
            streams,
            auto_ref_lla,
            flash: None,
            flash_generation: 0,
            context: crate::DispatchContext::default(),
            fanout,
            pending_commands: Vec::new(),
            stats: DispatchStats::default(),
        }
    }

    /// Permit sensor record dispatch; called after a successful handshake
    pub fn arm(&mut self) {
        self.armed = true;
        info!("dispatcher armed, sensor records flowing");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Session counters
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// True once the timebase is GPS-anchored
    pub fn gps_anchored(&self) -> bool {
        self.clock.gps_anchored()
    }

    /// Current host-to-device offset estimate
    pub fn local_offset(&self) -> f64 {
        self.clock.local_offset()
    }

    /// True once a GPS 3D fix has been observed
    pub fn has_fix(&self) -> bool {
        self.fix.has_fix()
    }

    /// Commands queued by handlers (e.g. the reference LLA latch), to be
    /// written to the link by the poll loop. Handlers never block on the
    /// transport themselves.
    pub fn take_pending_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Sink metrics snapshots, for end-of-run reporting
    pub fn sink_metrics(&self) -> Vec<(String, crate::MetricsSnapshot)> {
        self.fanout.metrics()
    }

    /// Shut down the sink workers, flushing queued records
    pub async fn shutdown(self) {
        self.fanout.shutdown().await;
    }

    /// Consume one decoded record, in arrival order
    #[instrument(name = "dispatch", level = "trace", skip(self, record), fields(tag = record.tag()))]
    pub fn dispatch(&mut self, record: MessageRecord) {
        self.stats.received += 1;
        metrics::counter!("ins_bridge_records_received_total", "type" => record.tag()).increment(1);

        // Handshake-class and diagnostic records bypass the armed gate
        match record {
            MessageRecord::FlashConfig(data) => return self.handle_flash_config(data),
            MessageRecord::Unparsed(bytes) => return self.handle_unparsed(bytes),
            MessageRecord::Unknown { data_id } => {
                self.stats.unknown += 1;
                debug!(data_id, "unhandled dataset id");
                return;
            }
            _ => {}
        }

        if !self.armed {
            self.stats.dropped_unarmed += 1;
            trace!(tag = record.tag(), "dropped: not armed");
            return;
        }

        match record {
            MessageRecord::Ins1(data) => self.handle_ins1(data),
            MessageRecord::Ins2(data) => self.handle_ins2(data),
            MessageRecord::InsVariance(data) => self.handle_ins_variance(data),
            MessageRecord::DualImu(data) => self.handle_dual_imu(data),
            MessageRecord::GpsNav(data) => self.handle_gps_nav(data),
            MessageRecord::GpsSatInfo(data) => self.handle_gps_sat_info(data),
            MessageRecord::Magnetometer { unit, data } => self.handle_magnetometer(unit, data),
            MessageRecord::Barometer(data) => self.handle_barometer(data),
            MessageRecord::PreintImu(data) => self.handle_preint_imu(data),
            MessageRecord::StrobeInTime(data) => self.handle_strobe(data),
            MessageRecord::FlashConfig(_)
            | MessageRecord::Unparsed(_)
            | MessageRecord::Unknown { .. } => unreachable!("handled above"),
        }
    }

    fn header(&self, stamp: Timestamp) -> Header {
        Header {
            stamp,
            frame_id: self.frame_id.clone(),
        }
    }

    fn publish(&mut self, record: TelemetryRecord) {
        metrics::counter!("ins_bridge_records_published_total", "type" => record.tag())
            .increment(1);
        self.stats.published += 1;
        self.fanout.publish(&record);
    }

    fn handle_flash_config(&mut self, data: FlashConfigData) {
        info!(
            nav_dt_ms = data.nav_dt_ms,
            dyn_model = data.ins_dyn_model,
            "flash configuration snapshot updated"
        );
        self.flash = Some(data);
        self.flash_generation += 1;
    }

    fn handle_unparsed(&mut self, bytes: Bytes) {
        self.stats.unparsed += 1;
        warn!(len = bytes.len(), "unparsed bytes from device");
        metrics::counter!("ins_bridge_unparsed_total").increment(1);

        let record = TelemetryRecord::Diagnostic(DiagnosticRecord {
            header: self.header(self.clock.host_now()),
            payload: bytes,
        });
        self.publish(record);
    }

    fn handle_ins1(&mut self, data: Ins1Data) {
        if self.context.ins_status != data.ins_status {
            debug!(
                old = format_args!("{:#010x}", self.context.ins_status),
                new = format_args!("{:#010x}", data.ins_status),
                "INS status changed"
            );
        }
        self.context.ned = data.ned;
        self.context.lla = data.lla;
        self.context.ins_status = data.ins_status;
        self.context.hdw_status = data.hdw_status;

        self.maybe_latch_ref_lla();
    }

    /// One-shot: after fix acquisition, persist the current position as the
    /// device's NED reference.
    fn maybe_latch_ref_lla(&mut self) {
        if !self.auto_ref_lla || self.context.ref_lla_latched || !self.fix.has_fix() {
            return;
        }
        self.context.ref_lla_latched = true;
        info!(
            lat = self.context.lla[0],
            lon = self.context.lla[1],
            "latching reference LLA to device"
        );
        self.pending_commands
            .push(DeviceCommand::SetFlashField(FlashField {
                key: FlashKey::RefLla,
                value: FlashValue::VecF64(self.context.lla),
            }));
    }

    fn handle_ins2(&mut self, data: Ins2Data) {
        let stamp = self.clock.resolve_week_tow(data.week, data.time_of_week);
        self.context.ins_status = data.ins_status;
        self.context.hdw_status = data.hdw_status;

        if !self.streams.ins.enabled {
            return;
        }

        let record = TelemetryRecord::Odometry(OdometryRecord {
            header: self.header(stamp),
            position: self.context.ned,
            orientation: data.qn2b,
            linear_velocity: data.uvw,
            angular_velocity: self.context.angular_rate,
            position_variance: self.context.position_variance,
            attitude_variance: self.context.attitude_variance,
            ins_status: data.ins_status,
        });
        self.publish(record);
    }

    fn handle_ins_variance(&mut self, data: InsVarianceData) {
        self.context.position_variance = Some(data.p_ned);
        self.context.attitude_variance = Some(data.p_att);
    }

    fn handle_dual_imu(&mut self, data: DualImuData) {
        let stamp = self.clock.resolve_device_time(data.time);
        self.context.angular_rate = data.units[0].pqr;

        if !self.streams.imu.enabled {
            return;
        }

        for (unit, sample) in [
            (SensorUnit::One, data.units[0]),
            (SensorUnit::Two, data.units[1]),
        ] {
            let record = TelemetryRecord::Imu {
                unit,
                record: ImuRecord {
                    header: self.header(stamp),
                    angular_velocity: sample.pqr,
                    linear_acceleration: sample.acc,
                },
            };
            self.publish(record);
        }
    }

    /// GPS navigation updates the timebase and fix latch on every record,
    /// even when the GPS output stream is disabled. This keeps time
    /// synchronization live independent of what the operator publishes.
    fn handle_gps_nav(&mut self, data: GpsNavData) {
        self.clock.record_gps(data.week, data.tow_offset);
        self.fix.observe(&data);
        metrics::gauge!("ins_bridge_gps_anchored").set(if self.clock.gps_anchored() {
            1.0
        } else {
            0.0
        });

        if !self.streams.gps.enabled {
            return;
        }

        let stamp = timestamp_from_week_tow(data.week, data.time_of_week_ms as f64 / 1e3);
        let record = TelemetryRecord::Gps(GpsRecord {
            header: self.header(stamp),
            fix_type: data.fix_type(),
            num_sats: data.num_sats(),
            cno: data.cno,
            latitude: data.lla[0],
            longitude: data.lla[1],
            altitude: data.lla[2],
            h_msl: data.h_msl,
            h_acc: data.h_acc,
            v_acc: data.v_acc,
            p_dop: data.p_dop,
            linear_velocity: data.vel_ned,
            ground_speed_2d: data.ground_speed_2d,
            ground_speed_3d: data.ground_speed_3d,
            course: data.course,
            course_acc: data.course_acc,
            messages_per_second: data.rx_per_second,
        });
        self.publish(record);
    }

    fn handle_gps_sat_info(&mut self, data: GpsSatInfoData) {
        let stamp = self.clock.resolve_tow(data.time_of_week_ms as f64 / 1e3);

        if !self.streams.gps_info.enabled {
            return;
        }

        let record = TelemetryRecord::GpsInfo(GpsInfoRecord {
            header: self.header(stamp),
            num_sats: data.num_sats,
            satellites: data.sats,
        });
        self.publish(record);
    }

    fn handle_magnetometer(&mut self, unit: SensorUnit, data: MagnetometerData) {
        let stamp = self.clock.resolve_device_time(data.time);

        if !self.streams.magnetometer.enabled {
            return;
        }

        let record = TelemetryRecord::Magnetometer {
            unit,
            record: MagRecord {
                header: self.header(stamp),
                magnetic_field: data.mag,
            },
        };
        self.publish(record);
    }

    fn handle_barometer(&mut self, data: BarometerData) {
        let stamp = self.clock.resolve_device_time(data.time);

        if !self.streams.barometer.enabled {
            return;
        }

        let record = TelemetryRecord::Barometer(BaroRecord {
            header: self.header(stamp),
            fluid_pressure: data.bar,
        });
        self.publish(record);
    }

    fn handle_preint_imu(&mut self, data: PreintImuData) {
        let stamp = self.clock.resolve_device_time(data.time);

        if !self.streams.preint_imu.enabled {
            return;
        }

        let record = TelemetryRecord::PreintImu(PreintImuRecord {
            header: self.header(stamp),
            theta: data.theta,
            vel: data.vel,
            dt: data.dt,
        });
        self.publish(record);
    }

    fn handle_strobe(&mut self, data: StrobeInTimeData) {
        let stamp = self
            .clock
            .resolve_week_tow(data.week, data.time_of_week_ms as f64 / 1e3);

        let record = TelemetryRecord::Strobe(StrobeRecord {
            header: self.header(stamp),
            pin: data.pin,
            count: data.count,
        });
        self.publish(record);
    }
}

impl<C: WallClock> RecordIngest for MessageDispatcher<C> {
    fn ingest(&mut self, record: MessageRecord) {
        self.dispatch(record);
    }

    fn flash_generation(&self) -> u64 {
        self.flash_generation
    }

    fn flash_config(&self) -> Option<&FlashConfigData> {
        self.flash.as_ref()
    }
}
