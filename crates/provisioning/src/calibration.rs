//! One-shot calibration commands.

use tracing::{info, instrument};

use contracts::{BridgeError, DeviceCommand, DeviceLink, MagCalMode};

/// Issues magnetometer calibration commands on external request
///
/// The write is synchronous and only acceptance is reported; calibration
/// progress, if visible at all, shows up in subsequent ordinary telemetry.
pub struct CalibrationTrigger;

impl CalibrationTrigger {
    /// Write a calibration command to the device
    #[instrument(name = "calibration_trigger", skip(link), fields(mode = ?mode))]
    pub fn trigger<L: DeviceLink>(link: &mut L, mode: MagCalMode) -> Result<(), BridgeError> {
        link.send(&DeviceCommand::MagCal(mode))?;
        info!(link = %link.describe(), "calibration command accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_link::{MockLink, MockLinkConfig};

    #[test]
    fn trigger_writes_calibration_command() {
        let mut link = MockLink::new();
        CalibrationTrigger::trigger(&mut link, MagCalMode::MultiAxis).unwrap();

        assert_eq!(
            link.sent_commands(),
            &[DeviceCommand::MagCal(MagCalMode::MultiAxis)]
        );
    }

    #[test]
    fn transport_failure_is_reported() {
        let mut link = MockLink::with_config(MockLinkConfig {
            fail_commands: vec!["mag_cal".to_string()],
            ..Default::default()
        });
        let err = CalibrationTrigger::trigger(&mut link, MagCalMode::SingleAxis).unwrap_err();
        assert!(matches!(err, BridgeError::CommandWrite { .. }));
    }
}
