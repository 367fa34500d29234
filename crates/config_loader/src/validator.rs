//! Configuration validation
//!
//! Rules:
//! - device.port non-empty, baudrate > 0
//! - enabled stream rates in (0, 1000] Hz
//! - nav_dt_ms in [1, 1000]
//! - handshake timeouts > 0
//! - sink names unique, required params present

use std::collections::HashSet;

use contracts::{BridgeBlueprint, BridgeError, SinkType, StreamKind};

/// Validate a BridgeBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    validate_device(blueprint)?;
    validate_streams(blueprint)?;
    validate_flash(blueprint)?;
    validate_handshake(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_device(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    if blueprint.device.port.is_empty() {
        return Err(BridgeError::config_validation("device.port", "must not be empty"));
    }
    if blueprint.device.baudrate == 0 {
        return Err(BridgeError::config_validation(
            "device.baudrate",
            "must be greater than zero",
        ));
    }
    if blueprint.device.frame_id.is_empty() {
        return Err(BridgeError::config_validation(
            "device.frame_id",
            "must not be empty",
        ));
    }
    Ok(())
}

fn validate_streams(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    const KINDS: [(StreamKind, &str); 7] = [
        (StreamKind::Ins, "streams.ins"),
        (StreamKind::Imu, "streams.imu"),
        (StreamKind::GpsNav, "streams.gps"),
        (StreamKind::GpsSatInfo, "streams.gps_info"),
        (StreamKind::Magnetometer, "streams.magnetometer"),
        (StreamKind::Barometer, "streams.barometer"),
        (StreamKind::PreintImu, "streams.preint_imu"),
    ];

    for (kind, field) in KINDS {
        let toggle = blueprint.streams.toggle(kind);
        // GPS nav is requested for time sync even when disabled, so its
        // rate must be valid regardless of the enabled flag.
        let rate_matters = toggle.enabled || kind == StreamKind::GpsNav;
        if rate_matters && (toggle.rate_hz == 0 || toggle.rate_hz > 1000) {
            return Err(BridgeError::config_validation(
                format!("{field}.rate_hz"),
                "must be in (0, 1000] Hz",
            ));
        }
    }
    Ok(())
}

fn validate_flash(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    let nav_dt = blueprint.flash.nav_dt_ms;
    if nav_dt == 0 || nav_dt > 1000 {
        return Err(BridgeError::config_validation(
            "flash.nav_dt_ms",
            "must be in [1, 1000] ms",
        ));
    }

    let [lat, lon, _] = blueprint.flash.ref_lla;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(BridgeError::config_validation(
            "flash.ref_lla",
            "latitude/longitude out of range",
        ));
    }
    Ok(())
}

fn validate_handshake(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    if blueprint.handshake.response_timeout_s <= 0.0 {
        return Err(BridgeError::config_validation(
            "handshake.response_timeout_s",
            "must be positive",
        ));
    }
    if blueprint.handshake.reset_settle_s < 0.0 {
        return Err(BridgeError::config_validation(
            "handshake.reset_settle_s",
            "must not be negative",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &BridgeBlueprint) -> Result<(), BridgeError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if sink.name.is_empty() {
            return Err(BridgeError::config_validation("sinks[].name", "must not be empty"));
        }
        if !seen.insert(&sink.name) {
            return Err(BridgeError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(BridgeError::config_validation(
                format!("sinks[name={}].queue_capacity", sink.name),
                "must be greater than zero",
            ));
        }
        if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
            return Err(BridgeError::config_validation(
                format!("sinks[name={}].params.addr", sink.name),
                "network sink requires an 'addr' parameter",
            ));
        }
    }
    Ok(())
}
