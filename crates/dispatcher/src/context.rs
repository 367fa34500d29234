//! Cross-message dispatch state.

use contracts::Vector3;

/// State threaded between handlers within one session
///
/// Owned exclusively by the dispatcher; updated by whichever handler last
/// observed the relevant field, read by handlers that compose results from
/// a different record type's most recent values. Replaces the original
/// driver's function-local statics and message-object reuse.
#[derive(Debug, Default)]
pub struct DispatchContext {
    /// Latest NED position (from the position-form INS solution)
    pub ned: Vector3,

    /// Latest geodetic position
    pub lla: [f64; 3],

    /// Latest INS estimator status bits
    pub ins_status: u32,

    /// Latest hardware status bits
    pub hdw_status: u32,

    /// Latest body-frame angular rate (from IMU unit 1)
    pub angular_rate: Vector3,

    /// Latest INS position variance diagonal
    pub position_variance: Option<Vector3>,

    /// Latest INS attitude variance diagonal
    pub attitude_variance: Option<Vector3>,

    /// Reference LLA has been latched to the device after fix acquisition
    pub ref_lla_latched: bool,
}
