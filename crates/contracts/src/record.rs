//! MessageRecord - protocol decoder output
//!
//! Typed, tagged records decoded from the device's binary telemetry stream.
//! Produced by an external [`ProtocolCodec`](crate::ProtocolCodec); consumed
//! exactly once by the dispatcher.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::FlashConfigData;

/// GPS status word: number of satellites used
pub const GPS_STATUS_NUM_SATS_MASK: u32 = 0x0000_00FF;

/// GPS status word: fix type field
pub const GPS_STATUS_FIX_TYPE_MASK: u32 = 0x0000_1F00;

/// GPS status word: 3D fix
pub const GPS_STATUS_FIX_TYPE_3D: u32 = 0x0000_0300;

/// Decoded device message
///
/// Each sensor variant carries either a GPS week + time-of-week pair or a
/// device-boot-relative timestamp in seconds; the timebase crate resolves
/// both into absolute time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRecord {
    /// Device's persisted configuration (handshake response)
    FlashConfig(FlashConfigData),

    /// INS solution, position form (NED + LLA + Euler attitude)
    Ins1(Ins1Data),

    /// INS solution, quaternion form (orientation + body velocity)
    Ins2(Ins2Data),

    /// INS solution covariance diagonals
    InsVariance(InsVarianceData),

    /// Dual IMU sample pair
    DualImu(DualImuData),

    /// GPS navigation solution
    GpsNav(GpsNavData),

    /// GPS satellite signal info
    GpsSatInfo(GpsSatInfoData),

    /// Magnetometer sample (unit 1 or 2)
    Magnetometer { unit: SensorUnit, data: MagnetometerData },

    /// Barometric pressure sample
    Barometer(BarometerData),

    /// Preintegrated IMU (coning and sculling integrals)
    PreintImu(PreintImuData),

    /// Hardware strobe input timestamp
    StrobeInTime(StrobeInTimeData),

    /// Bytes the decoder could not frame (diagnostic path)
    Unparsed(Bytes),

    /// Dataset id the decoder recognized but this bridge does not handle
    Unknown { data_id: u32 },
}

impl MessageRecord {
    /// Short tag for logging and metric labels
    pub fn tag(&self) -> &'static str {
        match self {
            Self::FlashConfig(_) => "flash_config",
            Self::Ins1(_) => "ins1",
            Self::Ins2(_) => "ins2",
            Self::InsVariance(_) => "ins_variance",
            Self::DualImu(_) => "dual_imu",
            Self::GpsNav(_) => "gps_nav",
            Self::GpsSatInfo(_) => "gps_sat_info",
            Self::Magnetometer { .. } => "magnetometer",
            Self::Barometer(_) => "barometer",
            Self::PreintImu(_) => "preint_imu",
            Self::StrobeInTime(_) => "strobe_in_time",
            Self::Unparsed(_) => "unparsed",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// Which physical unit produced a duplicated sensor's sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorUnit {
    One,
    Two,
}

/// INS solution, position form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ins1Data {
    /// GPS week number
    pub week: u32,

    /// GPS time of week (seconds)
    pub time_of_week: f64,

    /// INS estimator status bits
    pub ins_status: u32,

    /// Hardware status bits
    pub hdw_status: u32,

    /// Euler attitude (roll, pitch, yaw; rad)
    pub theta: Vector3,

    /// Body-frame velocity (m/s)
    pub uvw: Vector3,

    /// Geodetic position (deg, deg, m)
    pub lla: [f64; 3],

    /// Position relative to the reference LLA (NED, m)
    pub ned: Vector3,
}

/// INS solution, quaternion form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ins2Data {
    /// GPS week number
    pub week: u32,

    /// GPS time of week (seconds)
    pub time_of_week: f64,

    /// INS estimator status bits
    pub ins_status: u32,

    /// Hardware status bits
    pub hdw_status: u32,

    /// NED-to-body quaternion (w, x, y, z)
    pub qn2b: Quaternion,

    /// Body-frame velocity (m/s)
    pub uvw: Vector3,

    /// Geodetic position (deg, deg, m)
    pub lla: [f64; 3],
}

/// INS covariance diagonals
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InsVarianceData {
    /// GPS time of week (seconds)
    pub time_of_week: f64,

    /// Position variance diagonal (NED, m^2)
    pub p_ned: Vector3,

    /// Velocity variance diagonal (m^2/s^2)
    pub p_vel: Vector3,

    /// Attitude variance diagonal (rad^2)
    pub p_att: Vector3,
}

/// Single IMU sample
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImuSample {
    /// Angular rate (rad/s)
    pub pqr: Vector3,

    /// Linear acceleration (m/s^2)
    pub acc: Vector3,
}

/// Dual IMU sample pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DualImuData {
    /// Time since device boot (seconds)
    pub time: f64,

    /// Samples from both IMU units
    pub units: [ImuSample; 2],
}

/// GPS navigation solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsNavData {
    /// GPS week number
    pub week: u32,

    /// GPS time of week (milliseconds)
    pub time_of_week_ms: u32,

    /// Status word (fix type, satellite count)
    pub status: u32,

    /// Average carrier-to-noise ratio (dBHz)
    pub cno: u32,

    /// Geodetic position (deg, deg, m)
    pub lla: [f64; 3],

    /// Height above mean sea level (m)
    pub h_msl: f32,

    /// Horizontal accuracy (m)
    pub h_acc: f32,

    /// Vertical accuracy (m)
    pub v_acc: f32,

    /// Position dilution of precision
    pub p_dop: f32,

    /// NED velocity (m/s)
    pub vel_ned: Vector3,

    /// 2D ground speed (m/s)
    pub ground_speed_2d: f32,

    /// 3D ground speed (m/s)
    pub ground_speed_3d: f32,

    /// Ground course (rad)
    pub course: f32,

    /// Course accuracy (rad)
    pub course_acc: f32,

    /// Offset between GPS time of week and device boot time (seconds).
    /// Zero until the receiver has computed time.
    pub tow_offset: f64,

    /// Navigation messages received per second
    pub rx_per_second: f32,
}

impl GpsNavData {
    /// Fix type field of the status word
    pub fn fix_type(&self) -> u32 {
        self.status & GPS_STATUS_FIX_TYPE_MASK
    }

    /// True when the receiver reports a 3D fix
    pub fn has_3d_fix(&self) -> bool {
        self.fix_type() == GPS_STATUS_FIX_TYPE_3D
    }

    /// Number of satellites used in the solution
    pub fn num_sats(&self) -> u32 {
        self.status & GPS_STATUS_NUM_SATS_MASK
    }
}

/// Per-satellite signal info
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SatInfo {
    /// Satellite vehicle id
    pub sv_id: u8,

    /// Carrier-to-noise ratio (dBHz)
    pub cno: u8,
}

/// GPS satellite table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsSatInfoData {
    /// GPS time of week (milliseconds)
    pub time_of_week_ms: u32,

    /// Number of satellites tracked
    pub num_sats: u32,

    /// Per-satellite info
    pub sats: Vec<SatInfo>,
}

/// Magnetometer sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MagnetometerData {
    /// Time since device boot (seconds)
    pub time: f64,

    /// Magnetic field (normalized)
    pub mag: Vector3,
}

/// Barometer sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BarometerData {
    /// Time since device boot (seconds)
    pub time: f64,

    /// Barometric pressure (kPa)
    pub bar: f64,
}

/// Preintegrated IMU sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreintImuData {
    /// Time since device boot (seconds)
    pub time: f64,

    /// Integrated rotation over the interval (rad)
    pub theta: Vector3,

    /// Integrated velocity change over the interval (m/s)
    pub vel: Vector3,

    /// Integration interval (seconds)
    pub dt: f32,
}

/// Hardware strobe input timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrobeInTimeData {
    /// GPS week number
    pub week: u32,

    /// GPS time of week (milliseconds)
    pub time_of_week_ms: u32,

    /// Strobe input pin number
    pub pin: u16,

    /// Strobe event counter
    pub count: u16,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion (w, x, y, z)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gps_nav(status: u32) -> GpsNavData {
        GpsNavData {
            week: 2100,
            time_of_week_ms: 345_600_000,
            status,
            cno: 42,
            lla: [40.1, -111.7, 1400.0],
            h_msl: 1385.0,
            h_acc: 1.2,
            v_acc: 2.1,
            p_dop: 1.1,
            vel_ned: Vector3::default(),
            ground_speed_2d: 0.0,
            ground_speed_3d: 0.0,
            course: 0.0,
            course_acc: 0.0,
            tow_offset: 12.5,
            rx_per_second: 5.0,
        }
    }

    #[test]
    fn fix_type_extraction() {
        let nav = sample_gps_nav(GPS_STATUS_FIX_TYPE_3D | 9);
        assert!(nav.has_3d_fix());
        assert_eq!(nav.num_sats(), 9);
    }

    #[test]
    fn no_fix_when_fix_bits_clear() {
        let nav = sample_gps_nav(12);
        assert!(!nav.has_3d_fix());
        assert_eq!(nav.num_sats(), 12);
    }

    #[test]
    fn record_tags_are_stable() {
        let record = MessageRecord::GpsNav(sample_gps_nav(0));
        assert_eq!(record.tag(), "gps_nav");
        let record = MessageRecord::Unknown { data_id: 99 };
        assert_eq!(record.tag(), "unknown");
    }

    #[test]
    fn record_serde_round_trip() {
        let record = MessageRecord::Magnetometer {
            unit: SensorUnit::Two,
            data: MagnetometerData {
                time: 10.25,
                mag: Vector3::new(0.2, -0.1, 0.45),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tag(), "magnetometer");
    }
}
