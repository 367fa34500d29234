//! JSON-lines protocol codec
//!
//! One record or command per newline-terminated JSON object. This is not
//! the device's binary protocol; it exists so the bridge can be driven end
//! to end against simulators and recorded logs without the proprietary
//! codec.

use bytes::Bytes;

use contracts::{DeviceCommand, MessageRecord, ProtocolCodec};

/// Newline-delimited JSON codec
#[derive(Debug, Default)]
pub struct JsonCodec {
    buf: Vec<u8>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next complete line out of the buffer
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop(); // trailing newline
        if line.ends_with(b"\r") {
            line.pop();
        }
        Some(line)
    }
}

impl ProtocolCodec for JsonCodec {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn next_record(&mut self) -> Option<MessageRecord> {
        loop {
            let line = self.take_line()?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<MessageRecord>(&line) {
                Ok(record) => return Some(record),
                // Frames that fail to decode surface on the diagnostic path
                Err(_) => return Some(MessageRecord::Unparsed(Bytes::from(line))),
            }
        }
    }

    fn encode(&self, command: &DeviceCommand) -> Bytes {
        let mut out = serde_json::to_vec(command).unwrap_or_default();
        out.push(b'\n');
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BarometerData, DeviceCommand};

    #[test]
    fn decodes_record_per_line() {
        let mut codec = JsonCodec::new();
        let record = MessageRecord::Barometer(BarometerData {
            time: 1.5,
            bar: 101.3,
        });
        let mut bytes = serde_json::to_vec(&record).unwrap();
        bytes.push(b'\n');

        codec.feed(&bytes);
        let decoded = codec.next_record().unwrap();
        assert_eq!(decoded.tag(), "barometer");
        assert!(codec.next_record().is_none());
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let mut codec = JsonCodec::new();
        codec.feed(b"{\"barometer\":{\"time\":1.0,");
        assert!(codec.next_record().is_none());

        codec.feed(b"\"bar\":99.0}}\n");
        assert_eq!(codec.next_record().unwrap().tag(), "barometer");
    }

    #[test]
    fn malformed_line_becomes_unparsed() {
        let mut codec = JsonCodec::new();
        codec.feed(b"not json at all\n");
        let record = codec.next_record().unwrap();
        assert_eq!(record.tag(), "unparsed");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut codec = JsonCodec::new();
        codec.feed(b"\n\r\n");
        assert!(codec.next_record().is_none());
    }

    #[test]
    fn encoded_commands_are_newline_terminated() {
        let codec = JsonCodec::new();
        let bytes = codec.encode(&DeviceCommand::GetFlashConfig);
        assert_eq!(bytes.last(), Some(&b'\n'));
        let parsed: DeviceCommand = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(parsed, DeviceCommand::GetFlashConfig);
    }
}
