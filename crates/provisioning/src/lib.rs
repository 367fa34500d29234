//! # Provisioning
//!
//! Everything that writes configuration to the device:
//!
//! - [`StreamController`]: turns per-stream enabled/rate settings into a
//!   deduplicated broadcast plan and applies it over the link
//! - [`FlashConfigHandshake`]: fetches the persisted configuration with a
//!   bounded deadline, rewrites mismatched fields, resets and reverifies
//! - [`CalibrationTrigger`]: one-shot magnetometer calibration commands
//!
//! Runs once at startup and occasionally on demand; after any device reset
//! all stream state is invalid and must be re-applied.

mod calibration;
mod handshake;
mod streams;

pub use calibration::CalibrationTrigger;
pub use handshake::{FlashConfigHandshake, HandshakeOutcome, HandshakeState};
pub use streams::StreamController;

pub use contracts::HandshakeConfig;
