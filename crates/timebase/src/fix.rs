//! GPS fix tracking.

use contracts::GpsNavData;
use tracing::info;

/// One-way latch for GPS 3D-fix acquisition
///
/// Set the first time a 3D-fix status is observed; never reset within a
/// session, even if later records report a degraded fix.
#[derive(Debug, Default)]
pub struct FixTracker {
    has_fix: bool,
}

impl FixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one GPS navigation record's status word
    pub fn observe(&mut self, nav: &GpsNavData) {
        if !self.has_fix && nav.has_3d_fix() {
            self.has_fix = true;
            info!(num_sats = nav.num_sats(), "GPS 3D fix acquired");
        }
    }

    /// True once any 3D fix has been seen this session
    pub fn has_fix(&self) -> bool {
        self.has_fix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Vector3, GPS_STATUS_FIX_TYPE_3D};

    fn nav_with_status(status: u32) -> GpsNavData {
        GpsNavData {
            week: 2100,
            time_of_week_ms: 0,
            status,
            cno: 0,
            lla: [0.0; 3],
            h_msl: 0.0,
            h_acc: 0.0,
            v_acc: 0.0,
            p_dop: 0.0,
            vel_ned: Vector3::default(),
            ground_speed_2d: 0.0,
            ground_speed_3d: 0.0,
            course: 0.0,
            course_acc: 0.0,
            tow_offset: 0.0,
            rx_per_second: 0.0,
        }
    }

    #[test]
    fn fix_latches_on_3d_status() {
        let mut fix = FixTracker::new();
        assert!(!fix.has_fix());

        fix.observe(&nav_with_status(GPS_STATUS_FIX_TYPE_3D | 8));
        assert!(fix.has_fix());
    }

    #[test]
    fn fix_never_resets() {
        let mut fix = FixTracker::new();
        fix.observe(&nav_with_status(GPS_STATUS_FIX_TYPE_3D | 8));

        // A later record without a fix must not clear the latch
        fix.observe(&nav_with_status(0));
        assert!(fix.has_fix());
    }

    #[test]
    fn non_fix_status_does_not_set() {
        let mut fix = FixTracker::new();
        fix.observe(&nav_with_status(7));
        assert!(!fix.has_fix());
    }
}
