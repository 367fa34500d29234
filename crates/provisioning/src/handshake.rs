//! Flash configuration handshake state machine.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use contracts::{
    BridgeError, DeviceCommand, DeviceLink, FlashConfigData, FlashKey, FlashParams,
    HandshakeConfig, RecordIngest,
};

/// Pacing of the cooperative wait loop
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Requesting,
    AwaitingResponse,
    Confirmed,
    Rewriting,
    ResettingDevice,
    TimedOut,
}

/// Terminal result of a completed handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Persisted configuration matches the desired parameters
    Confirmed,

    /// Some fields still differ after one rewrite-reset-reverify cycle.
    /// The bridge arms anyway; partial misconfiguration must not block all
    /// telemetry.
    Degraded { mismatches: Vec<FlashKey> },
}

/// Bounded-retry fetch/verify of the device's persisted configuration
///
/// `Idle → Requesting → AwaitingResponse → {Confirmed | TimedOut}`, and on
/// parameter mismatch `Confirmed → Rewriting → ResettingDevice → Requesting`
/// exactly once. A second mismatch ends in [`HandshakeOutcome::Degraded`]
/// rather than looping resets against a device that cannot persist the
/// requested value.
pub struct FlashConfigHandshake {
    config: HandshakeConfig,
    state: HandshakeState,
}

impl FlashConfigHandshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Idle,
        }
    }

    /// Current state (for diagnostics)
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the handshake to completion.
    ///
    /// Pumps the link cooperatively: every record polled while waiting is
    /// handed to `ingest`, so the flash response is observed through the
    /// ingest's snapshot generation counter and nothing else is lost.
    ///
    /// # Errors
    /// [`BridgeError::HandshakeTimeout`] when no flash-config record arrives
    /// within the response deadline. A timeout means the device is
    /// unreachable, not merely slow; the caller decides whether to retry.
    #[instrument(name = "flash_handshake_run", skip_all)]
    pub fn run<L, I>(
        &mut self,
        link: &mut L,
        ingest: &mut I,
        desired: &FlashParams,
    ) -> Result<HandshakeOutcome, BridgeError>
    where
        L: DeviceLink,
        I: RecordIngest,
    {
        let snapshot = self.fetch(link, ingest)?;

        let mismatched = desired.diff(&snapshot);
        if mismatched.is_empty() {
            self.state = HandshakeState::Confirmed;
            info!("flash config confirmed");
            return Ok(HandshakeOutcome::Confirmed);
        }

        info!(
            fields = mismatched.len(),
            "flash config differs, rewriting and resetting device"
        );

        self.state = HandshakeState::Rewriting;
        for field in &mismatched {
            link.send(&DeviceCommand::SetFlashField(*field))?;
        }

        self.state = HandshakeState::ResettingDevice;
        link.send(&DeviceCommand::Reset)?;
        self.settle(link, ingest)?;

        // Reverify once
        let snapshot = self.fetch(link, ingest)?;
        let still_mismatched = desired.diff(&snapshot);
        self.state = HandshakeState::Confirmed;

        if still_mismatched.is_empty() {
            info!("flash config confirmed after rewrite");
            Ok(HandshakeOutcome::Confirmed)
        } else {
            let mismatches: Vec<FlashKey> =
                still_mismatched.iter().map(|field| field.key).collect();
            let names: Vec<&str> = mismatches.iter().map(|key| key.name()).collect();
            warn!(
                fields = ?names,
                "flash config still differs after reset; continuing degraded"
            );
            Ok(HandshakeOutcome::Degraded { mismatches })
        }
    }

    /// One fetch cycle: request, then poll until the snapshot generation
    /// advances or the deadline elapses.
    fn fetch<L, I>(&mut self, link: &mut L, ingest: &mut I) -> Result<FlashConfigData, BridgeError>
    where
        L: DeviceLink,
        I: RecordIngest,
    {
        self.state = HandshakeState::Requesting;
        let mark = ingest.flash_generation();
        link.send(&DeviceCommand::GetFlashConfig)?;

        self.state = HandshakeState::AwaitingResponse;
        let started = Instant::now();
        let deadline = started + Duration::from_secs_f64(self.config.response_timeout_s);

        loop {
            // Check generation after every record so a telemetry backlog is
            // not drained past the response while still unarmed
            if let Some(record) = link.poll()? {
                ingest.ingest(record);
                if ingest.flash_generation() > mark {
                    return ingest.flash_config().cloned().ok_or_else(|| {
                        BridgeError::Other(
                            "flash generation advanced without a snapshot".to_string(),
                        )
                    });
                }
            } else {
                thread::sleep(POLL_INTERVAL);
            }

            // Checked even while records keep flowing: a chatty device that
            // never answers is still unreachable for our purposes
            if Instant::now() >= deadline {
                self.state = HandshakeState::TimedOut;
                return Err(BridgeError::HandshakeTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
    }

    /// Settle pause after a reset: keep draining the link, discard nothing.
    fn settle<L, I>(&mut self, link: &mut L, ingest: &mut I) -> Result<(), BridgeError>
    where
        L: DeviceLink,
        I: RecordIngest,
    {
        let until = Instant::now() + Duration::from_secs_f64(self.config.reset_settle_s);
        while Instant::now() < until {
            match link.poll()? {
                Some(record) => ingest.ingest(record),
                None => thread::sleep(POLL_INTERVAL),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MessageRecord;
    use device_link::{MockLink, MockLinkConfig};

    /// Minimal ingest double: remembers the latest flash snapshot
    #[derive(Default)]
    struct SnapshotIngest {
        flash: Option<FlashConfigData>,
        generation: u64,
        other_records: usize,
    }

    impl RecordIngest for SnapshotIngest {
        fn ingest(&mut self, record: MessageRecord) {
            match record {
                MessageRecord::FlashConfig(data) => {
                    self.flash = Some(data);
                    self.generation += 1;
                }
                _ => self.other_records += 1,
            }
        }

        fn flash_generation(&self) -> u64 {
            self.generation
        }

        fn flash_config(&self) -> Option<&FlashConfigData> {
            self.flash.as_ref()
        }
    }

    fn fast_config() -> HandshakeConfig {
        HandshakeConfig {
            response_timeout_s: 0.15,
            reset_settle_s: 0.01,
        }
    }

    fn matching_params(flash: &FlashConfigData) -> FlashParams {
        FlashParams {
            nav_dt_ms: flash.nav_dt_ms,
            ins_rotation: flash.ins_rotation,
            ins_offset: flash.ins_offset,
            gps_ant_offset: flash.gps_ant_offset,
            ref_lla: flash.ref_lla,
            mag_inclination: flash.mag_inclination,
            mag_declination: flash.mag_declination,
            mag_magnitude: flash.mag_magnitude,
            dynamic_model: flash.ins_dyn_model,
        }
    }

    #[test]
    fn confirms_when_config_matches() {
        let mut link = MockLink::new();
        let desired = matching_params(link.flash());
        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        let outcome = handshake.run(&mut link, &mut ingest, &desired).unwrap();
        assert_eq!(outcome, HandshakeOutcome::Confirmed);
        assert_eq!(handshake.state(), HandshakeState::Confirmed);
        assert_eq!(link.reset_count(), 0);
    }

    #[test]
    fn rewrites_resets_and_reverifies_on_mismatch() {
        let mut link = MockLink::new();
        let mut desired = matching_params(link.flash());
        desired.nav_dt_ms = link.flash().nav_dt_ms + 6;

        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        let outcome = handshake.run(&mut link, &mut ingest, &desired).unwrap();
        assert_eq!(outcome, HandshakeOutcome::Confirmed);
        assert_eq!(link.reset_count(), 1);
        assert_eq!(link.flash().nav_dt_ms, desired.nav_dt_ms);

        let set_fields = link
            .sent_commands()
            .iter()
            .filter(|c| c.tag() == "set_flash_field")
            .count();
        assert_eq!(set_fields, 1);
    }

    #[test]
    fn stubborn_device_ends_degraded_with_one_report() {
        let mut link = MockLink::with_config(MockLinkConfig {
            persist_writes: false,
            ..Default::default()
        });
        let mut desired = matching_params(link.flash());
        desired.nav_dt_ms = link.flash().nav_dt_ms + 6;

        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        let outcome = handshake.run(&mut link, &mut ingest, &desired).unwrap();
        match outcome {
            HandshakeOutcome::Degraded { mismatches } => {
                assert_eq!(mismatches, vec![FlashKey::NavDtMs]);
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        // Exactly one rewrite cycle: a second mismatch must not reset again
        assert_eq!(link.reset_count(), 1);
        assert_eq!(handshake.state(), HandshakeState::Confirmed);
    }

    #[test]
    fn silent_device_times_out_within_bounds() {
        let mut link = MockLink::with_config(MockLinkConfig {
            respond_flash: false,
            ..Default::default()
        });
        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        let started = Instant::now();
        let err = handshake
            .run(&mut link, &mut ingest, &FlashParams::default())
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, BridgeError::HandshakeTimeout { .. }));
        assert_eq!(handshake.state(), HandshakeState::TimedOut);
        assert!(elapsed >= Duration::from_millis(150), "fired early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "fired late: {elapsed:?}");
    }

    #[test]
    fn default_deadline_is_three_seconds() {
        assert_eq!(HandshakeConfig::default().response_timeout_s, 3.0);
    }

    #[test]
    fn queued_telemetry_survives_the_handshake() {
        let mut link = MockLink::new();
        // A telemetry backlog must not be drained away while unarmed: the
        // handshake stops consuming as soon as the response arrives
        link.push_record(MessageRecord::Barometer(contracts::BarometerData {
            time: 0.5,
            bar: 101.0,
        }));

        let desired = matching_params(link.flash());
        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        handshake.run(&mut link, &mut ingest, &desired).unwrap();
        assert_eq!(ingest.other_records, 0);
        assert!(matches!(
            link.poll().unwrap(),
            Some(MessageRecord::Barometer(_))
        ));
    }

    #[test]
    fn baud_rate_never_triggers_a_rewrite() {
        let mut config = MockLinkConfig::default();
        config.flash.ser0_baud_rate = 921_600;
        let mut link = MockLink::with_config(config);

        let desired = matching_params(link.flash());
        let mut ingest = SnapshotIngest::default();
        let mut handshake = FlashConfigHandshake::new(fast_config());

        let outcome = handshake.run(&mut link, &mut ingest, &desired).unwrap();
        assert_eq!(outcome, HandshakeOutcome::Confirmed);
        assert_eq!(link.reset_count(), 0);
    }
}
