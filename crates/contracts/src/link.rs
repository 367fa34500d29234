//! DeviceLink trait - transport collaborator abstraction
//!
//! Defines a unified interface over the physical link to the device,
//! decoupling the bridge core from serial ports, replays and test doubles.
//! The byte-level framing/checksum protocol is likewise external, behind
//! [`ProtocolCodec`].

use bytes::Bytes;

use crate::{BridgeError, DeviceCommand, FlashConfigData, MessageRecord};

/// Physical or simulated link to the device
///
/// The bridge core drives a link from a single logical thread: one
/// cooperative loop polls for decoded records and issues configuration
/// writes in between polls. Implementations must not block in `poll`;
/// "no data yet" is `Ok(None)`.
pub trait DeviceLink {
    /// Non-blocking read step: pump available bytes through the decoder
    /// and return the next decoded record, if any.
    fn poll(&mut self) -> Result<Option<MessageRecord>, BridgeError>;

    /// Encode and write one configuration command.
    ///
    /// # Errors
    /// Returns [`BridgeError::CommandWrite`] when the transport rejects the
    /// write. The link does not retry.
    fn send(&mut self, command: &DeviceCommand) -> Result<(), BridgeError>;

    /// Human-readable description for logs ("serial:/dev/ttyUSB0", "mock")
    fn describe(&self) -> String;
}

/// Byte-level protocol codec
///
/// Owns framing, checksumming and dataset decoding for the device protocol.
/// This crate ships no implementation of the device's binary protocol; links
/// accept any codec.
pub trait ProtocolCodec: Send {
    /// Feed raw bytes read from the transport
    fn feed(&mut self, bytes: &[u8]);

    /// Next fully decoded record, if one is available
    fn next_record(&mut self) -> Option<MessageRecord>;

    /// Encode a configuration command into transport bytes
    fn encode(&self, command: &DeviceCommand) -> Bytes;
}

/// Record consumer used by the provisioning layer
///
/// The flash-config handshake pumps the link while waiting for its response;
/// every polled record is handed to the ingest so nothing is lost, and the
/// handshake observes the response through the snapshot generation counter.
pub trait RecordIngest {
    /// Consume one decoded record
    fn ingest(&mut self, record: MessageRecord);

    /// Monotonic counter, incremented on every flash-config record
    fn flash_generation(&self) -> u64;

    /// Most recent flash-config snapshot, if any has arrived
    fn flash_config(&self) -> Option<&FlashConfigData>;
}
