//! DeviceCommand - configuration writes issued to the device
//!
//! This subsystem decides *which* writes to issue and *when*; the wire
//! encoding belongs to the [`ProtocolCodec`](crate::ProtocolCodec).

use serde::{Deserialize, Serialize};

use crate::FlashField;

/// Broadcastable dataset on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastId {
    Ins1,
    Ins2,
    InsVariance,
    DualImu,
    GpsNav,
    GpsSatInfo,
    Magnetometer1,
    Magnetometer2,
    Barometer,
    PreintImu,
    FlashConfig,
    StrobeInTime,
}

/// Magnetometer calibration mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagCalMode {
    /// Recalibrate by rotating about a single axis
    SingleAxis,
    /// Recalibrate by rotating about all axes
    MultiAxis,
}

/// One broadcast request: dataset + streaming period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub id: BroadcastId,
    pub period_ms: u32,
}

/// Configuration write issued to the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCommand {
    /// Silence all active broadcasts
    StopBroadcasts,

    /// Request the persisted flash configuration
    GetFlashConfig,

    /// Rewrite one flash configuration field
    SetFlashField(FlashField),

    /// Enable a dataset broadcast at the given period
    SetBroadcastRate(BroadcastRequest),

    /// Reset the device. Destructive to in-flight streaming: all stream
    /// state must be re-requested afterwards.
    Reset,

    /// Start a magnetometer calibration
    MagCal(MagCalMode),
}

impl DeviceCommand {
    /// Short tag for logging
    pub fn tag(&self) -> &'static str {
        match self {
            Self::StopBroadcasts => "stop_broadcasts",
            Self::GetFlashConfig => "get_flash_config",
            Self::SetFlashField(_) => "set_flash_field",
            Self::SetBroadcastRate(_) => "set_broadcast_rate",
            Self::Reset => "reset",
            Self::MagCal(_) => "mag_cal",
        }
    }
}
