//! # Device Link
//!
//! Transport collaborators for the bridge.
//!
//! Responsibilities:
//! - Provide `DeviceLink` implementations: serial hardware, replay, mock
//! - Keep byte-level protocol concerns behind the `ProtocolCodec` trait
//! - Support injectable failures for testing
//!
//! The device's proprietary binary codec is external to this repository;
//! integrators hand a codec to [`SerialLink`]. The bundled [`JsonCodec`]
//! frames records and commands as JSON lines, which is enough to drive the
//! bridge against a simulator on a pseudo-terminal.
//!
//! ## Feature Flags
//!
//! - `serial`: Enable the serialport-backed link (requires serialport crate)

pub mod json_codec;
pub mod mock;
pub mod replay;

#[cfg(feature = "serial")]
pub mod serial;

pub use contracts::{DeviceCommand, DeviceLink, MessageRecord, ProtocolCodec};
pub use json_codec::JsonCodec;
pub use mock::{MockLink, MockLinkConfig};
pub use replay::{ReplayConfig, ReplayLink};

#[cfg(feature = "serial")]
pub use serial::SerialLink;
