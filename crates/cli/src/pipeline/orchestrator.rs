//! Pipeline orchestrator - coordinates all components.
//!
//! The ingest path is one cooperative loop on a blocking worker thread:
//! provision the device, then poll the link and dispatch each record
//! synchronously. Sink workers run as tokio tasks behind bounded queues, so
//! a slow sink never stalls ingest. A device reset inside the handshake
//! stalls the loop deliberately; nothing else is serviced meanwhile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::{
    BridgeBlueprint, BridgeError, DeviceCommand, DeviceLink, DualImuData, FlashConfigData,
    GpsNavData, ImuSample, Ins1Data, Ins2Data, MagnetometerData, MessageRecord, Quaternion,
    SensorUnit, Vector3, GPS_STATUS_FIX_TYPE_3D,
};
use device_link::{MockLink, MockLinkConfig, ReplayConfig, ReplayLink};
use dispatcher::{create_fanout, MessageDispatcher};
use observability::DispatchAggregator;
use provisioning::{FlashConfigHandshake, HandshakeOutcome, StreamController};

use super::RunStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The bridge blueprint configuration
    pub blueprint: BridgeBlueprint,

    /// Maximum number of records to publish (None = unlimited)
    pub max_records: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Stop after this long with no records (finite replays)
    pub idle_limit: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Replay a recorded record log instead of opening hardware
    pub replay_path: Option<std::path::PathBuf>,

    /// Loop replay when finished
    pub replay_loop: bool,

    /// Run against a scripted in-memory device
    pub mock: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

/// Link selected for this run
enum RunLink {
    Mock(Box<MockLink>),
    Replay(Box<ReplayLink>),
    #[cfg(feature = "serial")]
    Serial(Box<device_link::SerialLink>),
}

impl DeviceLink for RunLink {
    fn poll(&mut self) -> Result<Option<MessageRecord>, BridgeError> {
        match self {
            Self::Mock(link) => link.poll(),
            Self::Replay(link) => link.poll(),
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.poll(),
        }
    }

    fn send(&mut self, command: &DeviceCommand) -> Result<(), BridgeError> {
        match self {
            Self::Mock(link) => link.send(command),
            Self::Replay(link) => link.send(command),
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.send(command),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Mock(link) => link.describe(),
            Self::Replay(link) => link.describe(),
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.describe(),
        }
    }
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    ///
    /// `stop` is polled cooperatively; setting it ends the run after the
    /// current record.
    pub async fn run(self, stop: Arc<AtomicBool>) -> Result<RunStats> {
        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let link = self.build_link()?;
        info!(link = %link.describe(), "device link ready");

        self.run_with_link(link, stop).await
    }

    /// Run against an externally constructed link (library entry point;
    /// integrators pass a `SerialLink` wired to their device codec here)
    pub async fn run_with_link<L>(self, link: L, stop: Arc<AtomicBool>) -> Result<RunStats>
    where
        L: DeviceLink + Send + 'static,
    {
        let start_time = Instant::now();
        let blueprint = self.config.blueprint.clone();

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - published records will be dropped");
        }

        let fanout = create_fanout(&blueprint.sinks)
            .await
            .context("Failed to create sinks")?;
        let active_sinks = fanout.sink_count();

        let dispatcher = MessageDispatcher::new(
            blueprint.device.frame_id.clone(),
            blueprint.streams.clone(),
            blueprint.device.auto_ref_lla,
            fanout,
        );

        let max_records = self.config.max_records;
        let timeout = self.config.timeout;
        let idle_limit = self.config.idle_limit;

        // The whole ingest path runs on one blocking thread; the tokio
        // runtime keeps servicing sink workers meanwhile.
        let core = tokio::task::spawn_blocking(move || {
            core_loop(
                link,
                dispatcher,
                &blueprint,
                stop,
                max_records,
                timeout,
                idle_limit,
            )
        });

        let (dispatcher, outcome, dispatch_metrics) = core
            .await
            .context("ingest loop panicked")?
            .context("Pipeline execution failed")?;

        let stats = dispatcher.stats();
        let sink_metrics = dispatcher.sink_metrics();

        // Wait for sink workers to flush
        info!("Shutting down sinks...");
        dispatcher.shutdown().await;

        let run_stats = RunStats {
            records_received: stats.received,
            records_published: stats.published,
            dropped_unarmed: stats.dropped_unarmed,
            unparsed: stats.unparsed,
            unknown: stats.unknown,
            handshake_outcome: match outcome {
                HandshakeOutcome::Confirmed => "confirmed".to_string(),
                HandshakeOutcome::Degraded { .. } => "degraded".to_string(),
            },
            duration: start_time.elapsed(),
            active_sinks,
            sink_metrics,
            dispatch_metrics,
        };

        info!(
            duration_secs = run_stats.duration.as_secs_f64(),
            records = run_stats.records_published,
            "Pipeline shutdown complete"
        );

        Ok(run_stats)
    }

    fn build_link(&self) -> Result<RunLink> {
        if self.config.mock {
            info!("Running in MOCK mode (no hardware required)");
            return Ok(RunLink::Mock(Box::new(scripted_mock_link(
                &self.config.blueprint,
            ))));
        }

        if let Some(ref path) = self.config.replay_path {
            info!(path = %path.display(), "Running in REPLAY mode");
            let replay = ReplayLink::open(
                path,
                ReplayConfig {
                    pace: None,
                    loop_playback: self.config.replay_loop,
                },
            )?;
            return Ok(RunLink::Replay(Box::new(replay)));
        }

        #[cfg(feature = "serial")]
        {
            let device = &self.config.blueprint.device;
            info!(port = %device.port, baudrate = device.baudrate, "Opening serial link");
            let link = device_link::SerialLink::open(
                &device.port,
                device.baudrate,
                Box::new(device_link::JsonCodec::new()),
            )
            .with_context(|| format!("Failed to open device on {}", device.port))?;
            Ok(RunLink::Serial(Box::new(link)))
        }

        #[cfg(not(feature = "serial"))]
        {
            anyhow::bail!("built without the 'serial' feature; use --replay or --mock")
        }
    }
}

/// Provision the device and drive the single-threaded ingest loop
fn core_loop<L: DeviceLink>(
    mut link: L,
    mut dispatcher: MessageDispatcher,
    blueprint: &BridgeBlueprint,
    stop: Arc<AtomicBool>,
    max_records: Option<u64>,
    timeout: Option<Duration>,
    idle_limit: Option<Duration>,
) -> Result<(MessageDispatcher, HandshakeOutcome, DispatchAggregator), BridgeError> {
    // Silence stale streams from a previous session before negotiating
    link.send(&DeviceCommand::StopBroadcasts)?;

    let mut handshake = FlashConfigHandshake::new(blueprint.handshake);
    let outcome = match handshake.run(&mut link, &mut dispatcher, &blueprint.flash) {
        Ok(outcome) => outcome,
        Err(e) => {
            observability::record_handshake_result("timeout");
            return Err(e);
        }
    };
    match &outcome {
        HandshakeOutcome::Confirmed => observability::record_handshake_result("confirmed"),
        HandshakeOutcome::Degraded { mismatches } => {
            observability::record_handshake_result("degraded");
            warn!(fields = mismatches.len(), "continuing with degraded flash config");
        }
    }

    dispatcher.arm();
    StreamController::new(blueprint.streams.clone()).apply(&mut link)?;

    let mut aggregator = DispatchAggregator::new();
    let started = Instant::now();
    let mut last_record = Instant::now();
    info!(link = %link.describe(), "ingest loop running");

    loop {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested");
            break;
        }
        if let Some(max) = max_records {
            if dispatcher.stats().published >= max {
                info!(records = max, "reached max records limit");
                break;
            }
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                info!(timeout_secs = limit.as_secs_f64(), "pipeline timed out");
                break;
            }
        }

        match link.poll()? {
            Some(record) => {
                last_record = Instant::now();
                dispatcher.dispatch(record);

                // Handlers queue writes (e.g. the reference LLA latch)
                // rather than touching the transport themselves
                for command in dispatcher.take_pending_commands() {
                    link.send(&command)?;
                }

                if dispatcher.stats().received % 64 == 0 {
                    observability::record_clock_state(
                        dispatcher.local_offset(),
                        dispatcher.gps_anchored(),
                    );
                    aggregator
                        .observe_clock(dispatcher.local_offset(), dispatcher.gps_anchored());
                }
            }
            None => {
                if let Some(limit) = idle_limit {
                    if last_record.elapsed() >= limit {
                        info!("record source exhausted");
                        break;
                    }
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    let stats = dispatcher.stats();
    aggregator.set_counts(
        stats.received,
        stats.published,
        stats.dropped_unarmed,
        stats.unparsed,
        stats.unknown,
    );
    aggregator.observe_clock(dispatcher.local_offset(), dispatcher.gps_anchored());

    Ok((dispatcher, outcome, aggregator))
}

/// Flash snapshot matching the desired parameters (mock device state)
fn flash_from_params(params: &contracts::FlashParams) -> FlashConfigData {
    FlashConfigData {
        nav_dt_ms: params.nav_dt_ms,
        ins_rotation: params.ins_rotation,
        ins_offset: params.ins_offset,
        gps_ant_offset: params.gps_ant_offset,
        ref_lla: params.ref_lla,
        mag_inclination: params.mag_inclination,
        mag_declination: params.mag_declination,
        mag_magnitude: params.mag_magnitude,
        ins_dyn_model: params.dynamic_model,
        ser0_baud_rate: 3_000_000,
    }
}

/// Scripted mock session: a short synthetic flight with GPS lock
fn scripted_mock_link(blueprint: &BridgeBlueprint) -> MockLink {
    let config = MockLinkConfig {
        flash: flash_from_params(&blueprint.flash),
        ..Default::default()
    };
    let mut link = MockLink::with_config(config);

    const WEEK: u32 = 2300;
    const TOW_OFFSET: f64 = 345_590.0;

    let mut records = Vec::new();
    for i in 0..500u32 {
        let t = 10.0 + i as f64 * 0.01;
        let tow = TOW_OFFSET + t;

        if i % 10 == 0 {
            records.push(MessageRecord::GpsNav(GpsNavData {
                week: WEEK,
                time_of_week_ms: (tow * 1e3) as u32,
                status: GPS_STATUS_FIX_TYPE_3D | 12,
                cno: 42,
                lla: [40.25, -111.65, 1420.0],
                h_msl: 1400.0,
                h_acc: 1.1,
                v_acc: 1.8,
                p_dop: 1.2,
                vel_ned: Vector3::new(1.0, 0.2, 0.0),
                ground_speed_2d: 1.0,
                ground_speed_3d: 1.0,
                course: 0.1,
                course_acc: 0.05,
                tow_offset: TOW_OFFSET,
                rx_per_second: 10.0,
            }));
        }

        records.push(MessageRecord::DualImu(DualImuData {
            time: t,
            units: [
                ImuSample {
                    pqr: Vector3::new(0.01, -0.02, 0.005),
                    acc: Vector3::new(0.1, 0.0, -9.81),
                },
                ImuSample {
                    pqr: Vector3::new(0.011, -0.019, 0.004),
                    acc: Vector3::new(0.09, 0.01, -9.8),
                },
            ],
        }));

        records.push(MessageRecord::Ins1(Ins1Data {
            week: WEEK,
            time_of_week: tow,
            ins_status: 0x0000_0003,
            hdw_status: 0,
            theta: Vector3::new(0.0, 0.0, 0.1),
            uvw: Vector3::new(1.0, 0.0, 0.0),
            lla: [40.25, -111.65, 1420.0],
            ned: Vector3::new(i as f64 * 0.01, 0.0, 0.0),
        }));

        records.push(MessageRecord::Ins2(Ins2Data {
            week: WEEK,
            time_of_week: tow,
            ins_status: 0x0000_0003,
            hdw_status: 0,
            qn2b: Quaternion::default(),
            uvw: Vector3::new(1.0, 0.0, 0.0),
            lla: [40.25, -111.65, 1420.0],
        }));

        if i % 10 == 5 {
            records.push(MessageRecord::Magnetometer {
                unit: SensorUnit::One,
                data: MagnetometerData {
                    time: t,
                    mag: Vector3::new(0.21, 0.05, 0.43),
                },
            });
            records.push(MessageRecord::Barometer(contracts::BarometerData {
                time: t,
                bar: 85.7,
            }));
        }
    }

    link.push_records(records);
    link
}
