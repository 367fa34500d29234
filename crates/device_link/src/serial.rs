//! Serial device link
//!
//! Couples a serial port with a protocol codec. Reads are non-blocking:
//! `poll` drains whatever bytes the port has buffered, feeds them to the
//! codec and returns the next decoded record.

use std::io::{Read, Write};
use std::time::Duration;

use tracing::{info, instrument};

use contracts::{BridgeError, DeviceCommand, DeviceLink, MessageRecord, ProtocolCodec};

const READ_CHUNK: usize = 512;

/// Serial-port-backed device link
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    codec: Box<dyn ProtocolCodec>,
    path: String,
    buf: [u8; READ_CHUNK],
}

impl SerialLink {
    /// Open a serial port and attach a protocol codec
    ///
    /// # Errors
    /// [`BridgeError::LinkOpen`] when the port cannot be opened; fatal at
    /// startup, the bridge cannot proceed without the transport.
    #[instrument(name = "serial_link_open", skip(codec), fields(port = %path, baudrate))]
    pub fn open(
        path: &str,
        baudrate: u32,
        codec: Box<dyn ProtocolCodec>,
    ) -> Result<Self, BridgeError> {
        let port = serialport::new(path, baudrate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(|e| BridgeError::link_open(path, e.to_string()))?;

        info!(port = %path, baudrate, "serial link opened");

        Ok(Self {
            port,
            codec,
            path: path.to_string(),
            buf: [0u8; READ_CHUNK],
        })
    }
}

impl DeviceLink for SerialLink {
    fn poll(&mut self) -> Result<Option<MessageRecord>, BridgeError> {
        if let Some(record) = self.codec.next_record() {
            return Ok(Some(record));
        }

        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| BridgeError::link_read(e.to_string()))?;
        if available == 0 {
            return Ok(None);
        }

        let want = (available as usize).min(READ_CHUNK);
        match self.port.read(&mut self.buf[..want]) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.codec.feed(&self.buf[..n]);
                Ok(self.codec.next_record())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(BridgeError::link_read(e.to_string())),
        }
    }

    fn send(&mut self, command: &DeviceCommand) -> Result<(), BridgeError> {
        let bytes = self.codec.encode(command);
        self.port
            .write_all(&bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| BridgeError::command_write(command.tag(), e.to_string()))
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_codec::JsonCodec;

    #[test]
    fn open_nonexistent_port_is_link_open_error() {
        let err = SerialLink::open("/dev/nonexistent-port-xyz", 115_200, Box::new(JsonCodec::new()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::LinkOpen { .. }));
    }
}
