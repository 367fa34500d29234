//! Mock Pipeline Demo
//!
//! Drives the full bridge against a scripted in-memory device: handshake,
//! arming, stream plan, dispatch, sinks. Runs without any hardware.
//!
//! Run with: cargo run --bin mock_pipeline

use contracts::{
    DeviceLink, DualImuData, FlashParams, GpsNavData, HandshakeConfig, ImuSample, Ins1Data,
    Ins2Data, MessageRecord, Quaternion, StreamSettings, Vector3, GPS_STATUS_FIX_TYPE_3D,
};
use device_link::MockLink;
use dispatcher::{LogSink, MessageDispatcher, SinkHandle, TelemetryFanout};
use provisioning::{FlashConfigHandshake, StreamController};

const WEEK: u32 = 2300;
const TOW_OFFSET: f64 = 345_590.0;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: scripted device ====
    let mut link = MockLink::new();
    let desired = desired_params(&link);
    link.push_records(synthetic_session(200));

    // ==== Stage 2: sinks and dispatcher ====
    let fanout = TelemetryFanout::with_handles(vec![SinkHandle::spawn(LogSink::new("demo"), 256)]);
    let mut dispatcher = MessageDispatcher::new("body", StreamSettings::default(), false, fanout);

    // ==== Stage 3: provisioning ====
    let mut handshake = FlashConfigHandshake::new(HandshakeConfig::default());
    let outcome = handshake.run(&mut link, &mut dispatcher, &desired)?;
    tracing::info!(?outcome, "handshake complete");

    dispatcher.arm();
    StreamController::new(StreamSettings::default()).apply(&mut link)?;

    // ==== Stage 4: ingest ====
    while let Some(record) = link.poll()? {
        dispatcher.dispatch(record);
    }

    let stats = dispatcher.stats();
    tracing::info!(
        received = stats.received,
        published = stats.published,
        gps_anchored = dispatcher.gps_anchored(),
        "demo session complete"
    );

    dispatcher.shutdown().await;
    Ok(())
}

/// Desired flash parameters matching what the mock device already persists
fn desired_params(link: &MockLink) -> FlashParams {
    let flash = link.flash();
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

/// Short synthetic flight: 100 Hz INS/IMU with 10 Hz GPS
fn synthetic_session(iterations: u32) -> Vec<MessageRecord> {
    let mut records = Vec::new();
    for i in 0..iterations {
        let t = 10.0 + i as f64 * 0.01;
        let tow = TOW_OFFSET + t;

        if i % 10 == 0 {
            records.push(MessageRecord::GpsNav(GpsNavData {
                week: WEEK,
                time_of_week_ms: (tow * 1e3) as u32,
                status: GPS_STATUS_FIX_TYPE_3D | 11,
                cno: 43,
                lla: [40.25, -111.65, 1420.0],
                h_msl: 1400.0,
                h_acc: 1.0,
                v_acc: 1.5,
                p_dop: 1.2,
                vel_ned: Vector3::new(1.0, 0.0, 0.0),
                ground_speed_2d: 1.0,
                ground_speed_3d: 1.0,
                course: 0.0,
                course_acc: 0.1,
                tow_offset: TOW_OFFSET,
                rx_per_second: 10.0,
            }));
        }

        records.push(MessageRecord::DualImu(DualImuData {
            time: t,
            units: [
                ImuSample {
                    pqr: Vector3::new(0.01, 0.0, 0.0),
                    acc: Vector3::new(0.0, 0.0, -9.81),
                },
                ImuSample::default(),
            ],
        }));

        records.push(MessageRecord::Ins1(Ins1Data {
            week: WEEK,
            time_of_week: tow,
            ins_status: 3,
            hdw_status: 0,
            theta: Vector3::default(),
            uvw: Vector3::new(1.0, 0.0, 0.0),
            lla: [40.25, -111.65, 1420.0],
            ned: Vector3::new(i as f64 * 0.01, 0.0, 0.0),
        }));

        records.push(MessageRecord::Ins2(Ins2Data {
            week: WEEK,
            time_of_week: tow,
            ins_status: 3,
            hdw_status: 0,
            qn2b: Quaternion::default(),
            uvw: Vector3::new(1.0, 0.0, 0.0),
            lla: [40.25, -111.65, 1420.0],
        }));
    }
    records
}
