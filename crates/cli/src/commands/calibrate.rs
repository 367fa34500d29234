//! `calibrate` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use contracts::{DeviceLink, MagCalMode};
use device_link::MockLink;
use provisioning::CalibrationTrigger;

use crate::cli::CalibrateArgs;

/// Execute the `calibrate` command
///
/// Writes a one-shot calibration command and reports acceptance; the device
/// performs the calibration on its own time.
pub fn run_calibrate(args: &CalibrateArgs) -> Result<()> {
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mode: MagCalMode = args.mode.into();

    if args.mock {
        let mut link = MockLink::new();
        trigger(&mut link, mode)?;
        return Ok(());
    }

    #[cfg(feature = "serial")]
    {
        let device = &blueprint.device;
        let mut link = device_link::SerialLink::open(
            &device.port,
            device.baudrate,
            Box::new(device_link::JsonCodec::new()),
        )
        .with_context(|| format!("Failed to open device on {}", device.port))?;
        trigger(&mut link, mode)
    }

    #[cfg(not(feature = "serial"))]
    {
        let _ = blueprint;
        anyhow::bail!("built without the 'serial' feature; use --mock")
    }
}

fn trigger<L: DeviceLink>(link: &mut L, mode: MagCalMode) -> Result<()> {
    CalibrationTrigger::trigger(link, mode).context("Calibration command rejected")?;
    info!(mode = ?mode, "calibration command accepted");
    println!("Calibration command accepted ({mode:?}).");
    println!("Keep the vehicle moving through the requested rotation; progress");
    println!("is only observable through ordinary telemetry.");
    Ok(())
}
