//! Replay device link
//!
//! Replays a recorded JSON-lines log of `MessageRecord`s for offline runs.
//! Commands are accepted and logged but have no effect on the recording,
//! with one convenience: if the log contains no flash-config record, a
//! default snapshot is synthesized so the startup handshake can complete.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use contracts::{BridgeError, DeviceCommand, DeviceLink, FlashConfigData, MessageRecord};

/// Replay options
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Fixed delay between emitted records (None = as fast as polled)
    pub pace: Option<Duration>,

    /// Restart from the beginning when the log is exhausted
    pub loop_playback: bool,
}

/// Link that replays a recorded session
#[derive(Debug)]
pub struct ReplayLink {
    records: Vec<MessageRecord>,
    queue: VecDeque<usize>,
    config: ReplayConfig,
    has_flash_record: bool,
    synthesized_flash: VecDeque<MessageRecord>,
    next_due: Option<Instant>,
    commands: Vec<DeviceCommand>,
    source: String,
}

impl ReplayLink {
    /// Load a record log from a JSON-lines file
    pub fn open(path: &Path, config: ReplayConfig) -> Result<Self, BridgeError> {
        let file = File::open(path)
            .map_err(|e| BridgeError::link_open(path.display().to_string(), e.to_string()))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| BridgeError::link_read(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MessageRecord>(&line) {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, path = %path.display(), "skipped undecodable replay lines");
        }

        let has_flash_record = records
            .iter()
            .any(|r| matches!(r, MessageRecord::FlashConfig(_)));

        Ok(Self {
            queue: (0..records.len()).collect(),
            records,
            config,
            has_flash_record,
            synthesized_flash: VecDeque::new(),
            next_due: None,
            commands: Vec::new(),
            source: path.display().to_string(),
        })
    }

    /// Build a replay directly from records (tests, demos)
    pub fn from_records(records: Vec<MessageRecord>, config: ReplayConfig) -> Self {
        let has_flash_record = records
            .iter()
            .any(|r| matches!(r, MessageRecord::FlashConfig(_)));
        Self {
            queue: (0..records.len()).collect(),
            records,
            config,
            has_flash_record,
            synthesized_flash: VecDeque::new(),
            next_due: None,
            commands: Vec::new(),
            source: "memory".to_string(),
        }
    }

    /// Commands written during the replay
    pub fn sent_commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Records remaining in the current pass
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn pace_elapsed(&mut self) -> bool {
        let Some(pace) = self.config.pace else {
            return true;
        };
        let now = Instant::now();
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + pace);
                true
            }
        }
    }
}

impl DeviceLink for ReplayLink {
    fn poll(&mut self) -> Result<Option<MessageRecord>, BridgeError> {
        // Synthesized handshake responses jump the queue
        if let Some(record) = self.synthesized_flash.pop_front() {
            return Ok(Some(record));
        }

        if !self.pace_elapsed() {
            return Ok(None);
        }

        match self.queue.pop_front() {
            Some(idx) => Ok(Some(self.records[idx].clone())),
            None if self.config.loop_playback && !self.records.is_empty() => {
                debug!(source = %self.source, "replay wrapped");
                self.queue = (0..self.records.len()).collect();
                let idx = self.queue.pop_front().expect("non-empty log");
                Ok(Some(self.records[idx].clone()))
            }
            None => Ok(None),
        }
    }

    fn send(&mut self, command: &DeviceCommand) -> Result<(), BridgeError> {
        if matches!(command, DeviceCommand::GetFlashConfig) && !self.has_flash_record {
            self.synthesized_flash
                .push_back(MessageRecord::FlashConfig(FlashConfigData::default()));
        }
        self.commands.push(command.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BarometerData;
    use std::io::Write;

    fn baro(time: f64) -> MessageRecord {
        MessageRecord::Barometer(BarometerData { time, bar: 101.0 })
    }

    #[test]
    fn replays_records_in_order() {
        let mut link = ReplayLink::from_records(vec![baro(1.0), baro(2.0)], ReplayConfig::default());
        assert!(link.poll().unwrap().is_some());
        assert!(link.poll().unwrap().is_some());
        assert!(link.poll().unwrap().is_none());
    }

    #[test]
    fn loops_when_configured() {
        let config = ReplayConfig {
            loop_playback: true,
            ..Default::default()
        };
        let mut link = ReplayLink::from_records(vec![baro(1.0)], config);
        for _ in 0..5 {
            assert!(link.poll().unwrap().is_some());
        }
    }

    #[test]
    fn synthesizes_flash_response_when_log_lacks_one() {
        let mut link = ReplayLink::from_records(vec![baro(1.0)], ReplayConfig::default());
        link.send(&DeviceCommand::GetFlashConfig).unwrap();

        let record = link.poll().unwrap().unwrap();
        assert_eq!(record.tag(), "flash_config");
    }

    #[test]
    fn reads_json_lines_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let record = baro(3.5);
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        writeln!(file, "garbage line").unwrap();

        let link = ReplayLink::open(file.path(), ReplayConfig::default()).unwrap();
        assert_eq!(link.remaining(), 1);
    }

    #[test]
    fn missing_file_is_a_link_open_error() {
        let err = ReplayLink::open(Path::new("/nonexistent/replay.jsonl"), ReplayConfig::default())
            .unwrap_err();
        assert!(matches!(err, BridgeError::LinkOpen { .. }));
    }
}
