//! BridgeBlueprint - Config Loader output
//!
//! Describes a complete bridge deployment: device link settings, desired
//! telemetry streams, flash configuration parameters, handshake tuning and
//! output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{FlashConfigData, FlashField, FlashKey, FlashValue};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Device link settings
    pub device: DeviceConfig,

    /// Desired telemetry streams
    #[serde(default)]
    pub streams: StreamSettings,

    /// Desired flash configuration parameters
    #[serde(default)]
    pub flash: FlashParams,

    /// Handshake tuning
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Output routing configuration
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Device link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial port path
    #[serde(default = "default_port")]
    pub port: String,

    /// Serial baud rate
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,

    /// Frame-of-reference id stamped on published records
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Latch the reference LLA from the first INS solution after GPS fix
    #[serde(default)]
    pub auto_ref_lla: bool,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baudrate() -> u32 {
    3_000_000
}

fn default_frame_id() -> String {
    "body".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baudrate: default_baudrate(),
            frame_id: default_frame_id(),
            auto_ref_lla: false,
        }
    }
}

/// Logical telemetry streams the bridge can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Ins,
    Imu,
    GpsNav,
    GpsSatInfo,
    Magnetometer,
    Barometer,
    PreintImu,
}

/// Enabled flag + rate for one stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamToggle {
    pub enabled: bool,
    pub rate_hz: u32,
}

impl StreamToggle {
    pub fn new(enabled: bool, rate_hz: u32) -> Self {
        Self { enabled, rate_hz }
    }

    /// Broadcast period for this stream's rate
    pub fn period_ms(&self) -> u32 {
        1000 / self.rate_hz.max(1)
    }
}

/// Per-stream enabled/rate pairs
///
/// Read-only after startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_fast_stream")]
    pub ins: StreamToggle,

    #[serde(default = "default_fast_stream")]
    pub imu: StreamToggle,

    #[serde(default = "default_slow_stream")]
    pub gps: StreamToggle,

    #[serde(default = "default_slow_stream")]
    pub gps_info: StreamToggle,

    #[serde(default = "default_fast_stream")]
    pub magnetometer: StreamToggle,

    #[serde(default = "default_fast_stream")]
    pub barometer: StreamToggle,

    #[serde(default = "default_disabled_stream")]
    pub preint_imu: StreamToggle,
}

fn default_fast_stream() -> StreamToggle {
    StreamToggle::new(true, 100)
}

fn default_slow_stream() -> StreamToggle {
    StreamToggle::new(true, 10)
}

fn default_disabled_stream() -> StreamToggle {
    StreamToggle::new(false, 100)
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            ins: default_fast_stream(),
            imu: default_fast_stream(),
            gps: default_slow_stream(),
            gps_info: default_slow_stream(),
            magnetometer: default_fast_stream(),
            barometer: default_fast_stream(),
            preint_imu: default_disabled_stream(),
        }
    }
}

impl StreamSettings {
    /// Toggle for one stream kind
    pub fn toggle(&self, kind: StreamKind) -> StreamToggle {
        match kind {
            StreamKind::Ins => self.ins,
            StreamKind::Imu => self.imu,
            StreamKind::GpsNav => self.gps,
            StreamKind::GpsSatInfo => self.gps_info,
            StreamKind::Magnetometer => self.magnetometer,
            StreamKind::Barometer => self.barometer,
            StreamKind::PreintImu => self.preint_imu,
        }
    }
}

/// Desired flash configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashParams {
    /// Navigation filter update period (ms)
    #[serde(default = "default_nav_dt_ms")]
    pub nav_dt_ms: u32,

    /// INS rotation from sensor frame to vehicle frame (rad)
    #[serde(default)]
    pub ins_rotation: [f32; 3],

    /// INS offset from sensor origin to vehicle origin (m)
    #[serde(default)]
    pub ins_offset: [f32; 3],

    /// GPS antenna offset from sensor origin (m)
    #[serde(default)]
    pub gps_ant_offset: [f32; 3],

    /// Reference position for the NED frame (deg, deg, m)
    #[serde(default)]
    pub ref_lla: [f64; 3],

    /// Magnetic inclination (rad)
    #[serde(default = "default_mag_inclination")]
    pub mag_inclination: f32,

    /// Magnetic declination (rad)
    #[serde(default = "default_mag_declination")]
    pub mag_declination: f32,

    /// Magnetic field magnitude (normalized)
    #[serde(default = "default_mag_magnitude")]
    pub mag_magnitude: f32,

    /// INS dynamic model selector
    #[serde(default = "default_dynamic_model")]
    pub dynamic_model: u8,
}

fn default_nav_dt_ms() -> u32 {
    4
}

fn default_mag_inclination() -> f32 {
    1.148_785_4
}

fn default_mag_declination() -> f32 {
    0.200_072_9
}

fn default_mag_magnitude() -> f32 {
    1.0
}

fn default_dynamic_model() -> u8 {
    8
}

impl Default for FlashParams {
    fn default() -> Self {
        Self {
            nav_dt_ms: default_nav_dt_ms(),
            ins_rotation: [0.0; 3],
            ins_offset: [0.0; 3],
            gps_ant_offset: [0.0; 3],
            ref_lla: [0.0; 3],
            mag_inclination: default_mag_inclination(),
            mag_declination: default_mag_declination(),
            mag_magnitude: default_mag_magnitude(),
            dynamic_model: default_dynamic_model(),
        }
    }
}

impl FlashParams {
    /// Desired value of one field
    ///
    /// Returns `None` for fields this bridge never writes (baud rate stays
    /// whatever the device persisted).
    pub fn desired_value(&self, key: FlashKey) -> Option<FlashValue> {
        match key {
            FlashKey::NavDtMs => Some(FlashValue::U32(self.nav_dt_ms)),
            FlashKey::InsRotation => Some(FlashValue::VecF32(self.ins_rotation)),
            FlashKey::InsOffset => Some(FlashValue::VecF32(self.ins_offset)),
            FlashKey::GpsAntOffset => Some(FlashValue::VecF32(self.gps_ant_offset)),
            FlashKey::RefLla => Some(FlashValue::VecF64(self.ref_lla)),
            FlashKey::MagInclination => Some(FlashValue::F32(self.mag_inclination)),
            FlashKey::MagDeclination => Some(FlashValue::F32(self.mag_declination)),
            FlashKey::MagMagnitude => Some(FlashValue::F32(self.mag_magnitude)),
            FlashKey::InsDynModel => Some(FlashValue::U8(self.dynamic_model)),
            FlashKey::Ser0BaudRate => None,
        }
    }

    /// Fields whose persisted value differs from the desired parameters
    pub fn diff(&self, snapshot: &FlashConfigData) -> Vec<FlashField> {
        crate::FLASH_FIELD_TABLE
            .iter()
            .filter_map(|spec| {
                let desired = self.desired_value(spec.key)?;
                if desired.matches(&snapshot.value_of(spec.key)) {
                    None
                } else {
                    Some(FlashField {
                        key: spec.key,
                        value: desired,
                    })
                }
            })
            .collect()
    }
}

/// Handshake tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Deadline for the flash-config response (seconds)
    #[serde(default = "default_response_timeout")]
    pub response_timeout_s: f64,

    /// Settle pause after a device reset (seconds)
    #[serde(default = "default_reset_settle")]
    pub reset_settle_s: f64,
}

fn default_response_timeout() -> f64 {
    3.0
}

fn default_reset_settle() -> f64 {
    2.0
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            response_timeout_s: default_response_timeout(),
            reset_settle_s: default_reset_settle(),
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file output
    Jsonl,
    /// Network output (UDP)
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_defaults_match_device_driver() {
        let streams = StreamSettings::default();
        assert!(streams.ins.enabled);
        assert_eq!(streams.ins.rate_hz, 100);
        assert!(streams.gps.enabled);
        assert_eq!(streams.gps.rate_hz, 10);
        assert!(!streams.preint_imu.enabled);
    }

    #[test]
    fn toggle_period_from_rate() {
        assert_eq!(StreamToggle::new(true, 100).period_ms(), 10);
        assert_eq!(StreamToggle::new(true, 10).period_ms(), 100);
        // Degenerate rate clamps instead of dividing by zero
        assert_eq!(StreamToggle::new(true, 0).period_ms(), 1000);
    }

    #[test]
    fn diff_empty_when_snapshot_matches() {
        let params = FlashParams::default();
        let snapshot = FlashConfigData {
            nav_dt_ms: params.nav_dt_ms,
            ins_rotation: params.ins_rotation,
            ins_offset: params.ins_offset,
            gps_ant_offset: params.gps_ant_offset,
            ref_lla: params.ref_lla,
            mag_inclination: params.mag_inclination,
            mag_declination: params.mag_declination,
            mag_magnitude: params.mag_magnitude,
            ins_dyn_model: params.dynamic_model,
            ser0_baud_rate: 921_600,
        };
        // Baud rate is not a desired field, so it never produces a diff
        assert!(params.diff(&snapshot).is_empty());
    }

    #[test]
    fn diff_reports_changed_fields() {
        let mut params = FlashParams::default();
        params.nav_dt_ms = 10;
        params.ins_rotation = [0.0, 0.0, 1.5708];

        let snapshot = FlashConfigData {
            nav_dt_ms: 20,
            mag_inclination: params.mag_inclination,
            mag_declination: params.mag_declination,
            mag_magnitude: params.mag_magnitude,
            ins_dyn_model: params.dynamic_model,
            ..FlashConfigData::default()
        };

        let fields = params.diff(&snapshot);
        let keys: Vec<_> = fields.iter().map(|f| f.key).collect();
        assert!(keys.contains(&FlashKey::NavDtMs));
        assert!(keys.contains(&FlashKey::InsRotation));
        assert!(!keys.contains(&FlashKey::MagMagnitude));
    }

    #[test]
    fn blueprint_serde_round_trip() {
        let blueprint = BridgeBlueprint {
            version: ConfigVersion::V1,
            device: DeviceConfig::default(),
            streams: StreamSettings::default(),
            flash: FlashParams::default(),
            handshake: HandshakeConfig::default(),
            sinks: vec![SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            }],
        };
        let json = serde_json::to_string(&blueprint).unwrap();
        let parsed: BridgeBlueprint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.device.port, "/dev/ttyUSB0");
        assert_eq!(parsed.sinks.len(), 1);
    }
}
