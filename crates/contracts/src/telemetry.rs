//! TelemetryRecord - dispatcher output
//!
//! Synchronized, typed records published to the configured sinks. Every
//! record carries an absolute [`Timestamp`] and a frame-of-reference id.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Quaternion, SatInfo, SensorUnit, Vector3};

/// Absolute time as seconds + nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(sec: u64, nanos: u32) -> Self {
        Self { sec, nanos }
    }

    /// Build from fractional seconds, splitting out nanoseconds
    pub fn from_secs_f64(secs: f64) -> Self {
        let sec = secs.floor();
        let nanos = ((secs - sec) * 1e9).round() as u32;
        Self {
            sec: sec as u64,
            nanos: nanos.min(999_999_999),
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanos as f64 * 1e-9
    }
}

/// Common header for all published records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    /// Absolute timestamp resolved by the timebase
    pub stamp: Timestamp,

    /// Frame-of-reference identifier
    pub frame_id: String,
}

/// Published telemetry record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryRecord {
    /// Pose + twist composed from INS solutions and the latest IMU rates
    Odometry(OdometryRecord),

    /// Per-unit IMU sample
    Imu { unit: SensorUnit, record: ImuRecord },

    /// GPS navigation solution
    Gps(GpsRecord),

    /// GPS satellite table
    GpsInfo(GpsInfoRecord),

    /// Per-unit magnetometer sample
    Magnetometer { unit: SensorUnit, record: MagRecord },

    /// Barometric pressure
    Barometer(BaroRecord),

    /// Preintegrated IMU
    PreintImu(PreintImuRecord),

    /// Hardware strobe event
    Strobe(StrobeRecord),

    /// Unparsed bytes forwarded for logging
    Diagnostic(DiagnosticRecord),
}

impl TelemetryRecord {
    /// Short tag for logging and metric labels
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Odometry(_) => "odometry",
            Self::Imu { .. } => "imu",
            Self::Gps(_) => "gps",
            Self::GpsInfo(_) => "gps_info",
            Self::Magnetometer { .. } => "magnetometer",
            Self::Barometer(_) => "barometer",
            Self::PreintImu(_) => "preint_imu",
            Self::Strobe(_) => "strobe",
            Self::Diagnostic(_) => "diagnostic",
        }
    }

    /// Header of the record
    pub fn header(&self) -> &Header {
        match self {
            Self::Odometry(r) => &r.header,
            Self::Imu { record, .. } => &record.header,
            Self::Gps(r) => &r.header,
            Self::GpsInfo(r) => &r.header,
            Self::Magnetometer { record, .. } => &record.header,
            Self::Barometer(r) => &r.header,
            Self::PreintImu(r) => &r.header,
            Self::Strobe(r) => &r.header,
            Self::Diagnostic(r) => &r.header,
        }
    }
}

/// Pose + twist record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometryRecord {
    pub header: Header,

    /// Position relative to the reference LLA (NED, m)
    pub position: Vector3,

    /// NED-to-body orientation
    pub orientation: Quaternion,

    /// Body-frame linear velocity (m/s)
    pub linear_velocity: Vector3,

    /// Body-frame angular velocity from the latest IMU sample (rad/s)
    pub angular_velocity: Vector3,

    /// Position variance diagonal, when an INS variance record has arrived
    pub position_variance: Option<Vector3>,

    /// Attitude variance diagonal
    pub attitude_variance: Option<Vector3>,

    /// INS estimator status bits
    pub ins_status: u32,
}

/// IMU record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImuRecord {
    pub header: Header,
    pub angular_velocity: Vector3,
    pub linear_acceleration: Vector3,
}

/// GPS record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsRecord {
    pub header: Header,
    pub fix_type: u32,
    pub num_sats: u32,
    pub cno: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub h_msl: f32,
    pub h_acc: f32,
    pub v_acc: f32,
    pub p_dop: f32,
    pub linear_velocity: Vector3,
    pub ground_speed_2d: f32,
    pub ground_speed_3d: f32,
    pub course: f32,
    pub course_acc: f32,
    pub messages_per_second: f32,
}

/// GPS satellite info record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsInfoRecord {
    pub header: Header,
    pub num_sats: u32,
    pub satellites: Vec<SatInfo>,
}

/// Magnetometer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagRecord {
    pub header: Header,
    pub magnetic_field: Vector3,
}

/// Barometer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaroRecord {
    pub header: Header,
    pub fluid_pressure: f64,
}

/// Preintegrated IMU record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreintImuRecord {
    pub header: Header,
    pub theta: Vector3,
    pub vel: Vector3,
    pub dt: f32,
}

/// Strobe event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrobeRecord {
    pub header: Header,
    pub pin: u16,
    pub count: u16,
}

/// Diagnostic record for unparsed bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub header: Header,
    pub payload: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_from_secs_splits_nanos() {
        let ts = Timestamp::from_secs_f64(1234.5);
        assert_eq!(ts.sec, 1234);
        assert_eq!(ts.nanos, 500_000_000);
    }

    #[test]
    fn timestamp_round_trip() {
        let ts = Timestamp::from_secs_f64(98765.125);
        assert!((ts.as_secs_f64() - 98765.125).abs() < 1e-9);
    }

    #[test]
    fn timestamp_never_overflows_nanos() {
        // A fraction that rounds up to 1e9 must be clamped, not carried
        let ts = Timestamp::from_secs_f64(5.999_999_999_9);
        assert_eq!(ts.sec, 5);
        assert!(ts.nanos <= 999_999_999);
    }

    #[test]
    fn record_header_accessor() {
        let record = TelemetryRecord::Barometer(BaroRecord {
            header: Header {
                stamp: Timestamp::new(10, 20),
                frame_id: "body".to_string(),
            },
            fluid_pressure: 101.3,
        });
        assert_eq!(record.header().stamp.sec, 10);
        assert_eq!(record.tag(), "barometer");
    }
}
