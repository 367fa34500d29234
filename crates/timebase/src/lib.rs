//! # Timebase
//!
//! Clock-domain reconciliation for the bridge.
//!
//! The device reports time in three domains: GPS week + time-of-week,
//! device-boot-relative seconds, and (implicitly) the host wall clock.
//! This crate resolves all of them into absolute Unix time:
//!
//! - Once a GPS navigation message has supplied a time-of-week offset, every
//!   conversion is GPS-anchored, deterministic and reproducible.
//! - Before that, a low-pass filtered estimate of the host-to-device offset
//!   stands in, converging as messages arrive.
//!
//! ```
//! use timebase::{ClockSynchronizer, SystemClock};
//!
//! let mut clock = ClockSynchronizer::new(SystemClock);
//! clock.record_gps(2100, 12.5);
//! let stamp = clock.resolve_week_tow(2100, 345_600.25);
//! assert_eq!(stamp.nanos, 250_000_000);
//! ```

mod clock;
mod fix;

pub use clock::{
    timestamp_from_week_tow, ClockSynchronizer, SystemClock, WallClock, SECONDS_PER_WEEK,
    TOW_OFFSET_EPSILON, UNIX_TO_GPS_OFFSET,
};
pub use fix::FixTracker;
