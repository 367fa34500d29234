//! Mock device link
//!
//! In-memory device double for unit and integration tests: scripted record
//! queue, a command log, and injectable failure scenarios.

use std::collections::VecDeque;

use tracing::debug;

use contracts::{BridgeError, DeviceCommand, DeviceLink, FlashConfigData, MessageRecord};

/// Mock link configuration (failure injection)
#[derive(Debug, Clone)]
pub struct MockLinkConfig {
    /// Flash configuration the simulated device has persisted
    pub flash: FlashConfigData,

    /// Answer `GetFlashConfig` requests; disable to exercise the handshake
    /// timeout path
    pub respond_flash: bool,

    /// Persist `SetFlashField` writes; disable to simulate a device that
    /// cannot store the requested value (degraded handshake)
    pub persist_writes: bool,

    /// Command tags whose writes should fail
    pub fail_commands: Vec<String>,
}

impl Default for MockLinkConfig {
    fn default() -> Self {
        Self {
            flash: FlashConfigData::default(),
            respond_flash: true,
            persist_writes: true,
            fail_commands: Vec::new(),
        }
    }
}

/// Scripted in-memory device
pub struct MockLink {
    config: MockLinkConfig,
    flash: FlashConfigData,
    inbox: VecDeque<MessageRecord>,
    commands: Vec<DeviceCommand>,
    resets: u32,
}

impl MockLink {
    /// Create a mock with default configuration
    pub fn new() -> Self {
        Self::with_config(MockLinkConfig::default())
    }

    /// Create a mock with a custom configuration
    pub fn with_config(config: MockLinkConfig) -> Self {
        let flash = config.flash.clone();
        Self {
            config,
            flash,
            inbox: VecDeque::new(),
            commands: Vec::new(),
            resets: 0,
        }
    }

    /// Script one record for a later `poll`
    pub fn push_record(&mut self, record: MessageRecord) {
        self.inbox.push_back(record);
    }

    /// Script a batch of records
    pub fn push_records(&mut self, records: impl IntoIterator<Item = MessageRecord>) {
        self.inbox.extend(records);
    }

    /// All commands the bridge has written so far
    pub fn sent_commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Current simulated persisted configuration
    pub fn flash(&self) -> &FlashConfigData {
        &self.flash
    }

    /// Number of reset commands observed
    pub fn reset_count(&self) -> u32 {
        self.resets
    }

    fn should_fail(&self, command: &DeviceCommand) -> bool {
        self.config
            .fail_commands
            .iter()
            .any(|tag| tag == command.tag())
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for MockLink {
    fn poll(&mut self) -> Result<Option<MessageRecord>, BridgeError> {
        Ok(self.inbox.pop_front())
    }

    fn send(&mut self, command: &DeviceCommand) -> Result<(), BridgeError> {
        if self.should_fail(command) {
            return Err(BridgeError::command_write(command.tag(), "mock failure"));
        }

        debug!(command = command.tag(), "mock link received command");
        self.commands.push(command.clone());

        match command {
            DeviceCommand::GetFlashConfig => {
                // The device answers promptly, ahead of any queued backlog
                if self.config.respond_flash {
                    self.inbox
                        .push_front(MessageRecord::FlashConfig(self.flash.clone()));
                }
            }
            DeviceCommand::SetFlashField(field) => {
                if self.config.persist_writes {
                    self.flash.apply(field);
                }
            }
            DeviceCommand::Reset => {
                // A reset invalidates any in-flight streaming
                self.inbox.clear();
                self.resets += 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FlashField, FlashKey, FlashValue};

    #[test]
    fn get_flash_config_is_answered() {
        let mut link = MockLink::new();
        link.send(&DeviceCommand::GetFlashConfig).unwrap();

        let record = link.poll().unwrap().unwrap();
        assert_eq!(record.tag(), "flash_config");
        assert!(link.poll().unwrap().is_none());
    }

    #[test]
    fn silent_device_never_answers() {
        let mut link = MockLink::with_config(MockLinkConfig {
            respond_flash: false,
            ..Default::default()
        });
        link.send(&DeviceCommand::GetFlashConfig).unwrap();
        assert!(link.poll().unwrap().is_none());
    }

    #[test]
    fn set_field_persists_when_enabled() {
        let mut link = MockLink::new();
        link.send(&DeviceCommand::SetFlashField(FlashField {
            key: FlashKey::NavDtMs,
            value: FlashValue::U32(10),
        }))
        .unwrap();
        assert_eq!(link.flash().nav_dt_ms, 10);
    }

    #[test]
    fn stubborn_device_ignores_writes() {
        let mut link = MockLink::with_config(MockLinkConfig {
            persist_writes: false,
            ..Default::default()
        });
        let before = link.flash().nav_dt_ms;
        link.send(&DeviceCommand::SetFlashField(FlashField {
            key: FlashKey::NavDtMs,
            value: FlashValue::U32(before + 1),
        }))
        .unwrap();
        assert_eq!(link.flash().nav_dt_ms, before);
    }

    #[test]
    fn reset_drops_queued_records() {
        let mut link = MockLink::new();
        link.send(&DeviceCommand::GetFlashConfig).unwrap();
        link.send(&DeviceCommand::Reset).unwrap();
        assert!(link.poll().unwrap().is_none());
        assert_eq!(link.reset_count(), 1);
    }

    #[test]
    fn injected_failures_error() {
        let mut link = MockLink::with_config(MockLinkConfig {
            fail_commands: vec!["mag_cal".to_string()],
            ..Default::default()
        });
        let err = link
            .send(&DeviceCommand::MagCal(contracts::MagCalMode::SingleAxis))
            .unwrap_err();
        assert!(matches!(err, BridgeError::CommandWrite { .. }));
    }
}
