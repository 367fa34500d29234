//! Clock synchronization between device, GPS and host time.

use std::time::{SystemTime, UNIX_EPOCH};

use contracts::Timestamp;
use tracing::{debug, info};

/// GPS epoch (1980-01-06) relative to the Unix epoch, in seconds
pub const GPS_UNIX_OFFSET: u64 = 315_964_800;

/// Leap seconds accumulated between GPS time and UTC
pub const LEAP_SECONDS: u64 = 18;

/// Seconds to add to GPS time to obtain Unix time
pub const UNIX_TO_GPS_OFFSET: u64 = GPS_UNIX_OFFSET - LEAP_SECONDS;

/// Seconds in one GPS week
pub const SECONDS_PER_WEEK: u64 = 604_800;

/// Guard against floating noise around a zero time-of-week offset.
/// Strictly greater than this means the device has GPS time.
pub const TOW_OFFSET_EPSILON: f64 = 1e-3;

/// Gain of the host-to-device offset filter
const LOCAL_OFFSET_GAIN: f64 = 0.005;

/// Pure conversion from GPS week + time-of-week to absolute time
pub fn timestamp_from_week_tow(week: u32, time_of_week: f64) -> Timestamp {
    let whole = time_of_week.floor();
    let sec = UNIX_TO_GPS_OFFSET + week as u64 * SECONDS_PER_WEEK + whole as u64;
    let nanos = ((time_of_week - whole) * 1e9).round() as u32;
    Timestamp::new(sec, nanos.min(999_999_999))
}

/// Host wall clock abstraction, injectable for deterministic tests
pub trait WallClock {
    /// Current wall time as fractional seconds since the Unix epoch
    fn now_secs(&self) -> f64;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Converts device-relative or GPS time-of-week timestamps into absolute time
///
/// State transitions:
/// - `gps_tow_offset` moves from exactly 0 to a positive value once per fix
///   acquisition and may be refreshed afterward.
/// - `gps_week` is non-decreasing once GPS lock exists.
/// - `local_offset` is updated on every conversion made before GPS anchoring.
#[derive(Debug)]
pub struct ClockSynchronizer<C = SystemClock> {
    wall: C,
    gps_week: u64,
    gps_tow_offset: f64,
    local_offset: f64,
    got_first_message: bool,
}

impl<C: WallClock> ClockSynchronizer<C> {
    pub fn new(wall: C) -> Self {
        Self {
            wall,
            gps_week: 0,
            gps_tow_offset: 0.0,
            local_offset: 0.0,
            got_first_message: false,
        }
    }

    /// Record week and time-of-week offset from a GPS navigation message.
    ///
    /// Called unconditionally for every GPS navigation record, independent
    /// of fix status and of whether the GPS output stream is enabled.
    pub fn record_gps(&mut self, week: u32, tow_offset: f64) {
        let was_anchored = self.gps_anchored();
        self.gps_week = week as u64;
        self.gps_tow_offset = tow_offset;
        if !was_anchored && self.gps_anchored() {
            info!(week, tow_offset, "timebase GPS-anchored");
        }
    }

    /// True once a GPS-derived time-of-week offset is available
    pub fn gps_anchored(&self) -> bool {
        self.gps_tow_offset > TOW_OFFSET_EPSILON
    }

    /// Resolve a GPS week + time-of-week timestamp
    pub fn resolve_week_tow(&mut self, week: u32, time_of_week: f64) -> Timestamp {
        if self.gps_anchored() {
            timestamp_from_week_tow(week, time_of_week)
        } else {
            self.local_estimate(time_of_week)
        }
    }

    /// Resolve a time-of-week using the internally tracked week counter
    pub fn resolve_tow(&mut self, time_of_week: f64) -> Timestamp {
        if self.gps_anchored() {
            timestamp_from_week_tow(self.gps_week as u32, time_of_week)
        } else {
            self.local_estimate(time_of_week)
        }
    }

    /// Resolve a device-boot-relative timestamp.
    ///
    /// With GPS anchoring, boot time plus the time-of-week offset yields the
    /// GPS time of week; without it, the filtered host offset stands in.
    pub fn resolve_device_time(&mut self, device_time: f64) -> Timestamp {
        if self.gps_anchored() {
            timestamp_from_week_tow(self.gps_week as u32, device_time + self.gps_tow_offset)
        } else {
            self.local_estimate(device_time)
        }
    }

    /// Current host-to-device offset estimate (seconds)
    pub fn local_offset(&self) -> f64 {
        self.local_offset
    }

    /// Last recorded GPS week
    pub fn gps_week(&self) -> u64 {
        self.gps_week
    }

    /// Last recorded time-of-week offset
    pub fn tow_offset(&self) -> f64 {
        self.gps_tow_offset
    }

    /// Current host wall time, for records with no device timestamp
    pub fn host_now(&self) -> Timestamp {
        Timestamp::from_secs_f64(self.wall.now_secs())
    }

    /// Estimate absolute time from a device timestamp and the host clock.
    ///
    /// Device boot time has unknown skew relative to the host. The first
    /// message captures the offset outright; afterwards an exponential
    /// filter damps the jitter of per-message host-clock sampling. The
    /// estimate is superseded entirely once GPS supplies an offset.
    fn local_estimate(&mut self, device_time: f64) -> Timestamp {
        let now = self.wall.now_secs();
        if !self.got_first_message {
            self.local_offset = now - device_time;
            self.got_first_message = true;
            debug!(offset = self.local_offset, "captured initial device offset");
        } else {
            self.local_offset = LOCAL_OFFSET_GAIN * (now - device_time)
                + (1.0 - LOCAL_OFFSET_GAIN) * self.local_offset;
        }
        Timestamp::from_secs_f64(self.local_offset + device_time)
    }
}

impl Default for ClockSynchronizer<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}
