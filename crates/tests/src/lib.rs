//! # Integration Tests
//!
//! End-to-end tests over the mock device link:
//! - full bring-up (handshake, arming, stream plan, dispatch, sinks)
//! - dispatch gating before and after the handshake
//! - handshake timeout propagation

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{
        BridgeError, DeviceLink, DualImuData, FlashParams, GpsNavData, HandshakeConfig, ImuSample,
        Ins1Data, Ins2Data, MessageRecord, Quaternion, StreamSettings, Vector3,
        GPS_STATUS_FIX_TYPE_3D,
    };
    use device_link::{MockLink, MockLinkConfig};
    use dispatcher::{LogSink, MessageDispatcher, SinkHandle, TelemetryFanout};
    use provisioning::{FlashConfigHandshake, HandshakeOutcome, StreamController};

    const WEEK: u32 = 2300;
    const TOW_OFFSET: f64 = 345_590.0;

    fn fast_handshake() -> HandshakeConfig {
        HandshakeConfig {
            response_timeout_s: 0.2,
            reset_settle_s: 0.01,
        }
    }

    /// Desired params matching the mock's persisted flash
    fn matching_params(link: &MockLink) -> FlashParams {
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

    fn gps_record(t: f64) -> MessageRecord {
        MessageRecord::GpsNav(GpsNavData {
            week: WEEK,
            time_of_week_ms: ((TOW_OFFSET + t) * 1e3) as u32,
            status: GPS_STATUS_FIX_TYPE_3D | 10,
            cno: 41,
            lla: [40.2, -111.6, 1410.0],
            h_msl: 1390.0,
            h_acc: 1.0,
            v_acc: 1.6,
            p_dop: 1.1,
            vel_ned: Vector3::default(),
            ground_speed_2d: 0.0,
            ground_speed_3d: 0.0,
            course: 0.0,
            course_acc: 0.0,
            tow_offset: TOW_OFFSET,
            rx_per_second: 10.0,
        })
    }

    fn telemetry_batch(iterations: u32) -> Vec<MessageRecord> {
        let mut records = Vec::new();
        for i in 0..iterations {
            let t = 5.0 + i as f64 * 0.01;
            if i % 10 == 0 {
                records.push(gps_record(t));
            }
            records.push(MessageRecord::DualImu(DualImuData {
                time: t,
                units: [ImuSample::default(), ImuSample::default()],
            }));
            records.push(MessageRecord::Ins1(Ins1Data {
                week: WEEK,
                time_of_week: TOW_OFFSET + t,
                ins_status: 3,
                hdw_status: 0,
                theta: Vector3::default(),
                uvw: Vector3::default(),
                lla: [40.2, -111.6, 1410.0],
                ned: Vector3::new(i as f64 * 0.01, 0.0, 0.0),
            }));
            records.push(MessageRecord::Ins2(Ins2Data {
                week: WEEK,
                time_of_week: TOW_OFFSET + t,
                ins_status: 3,
                hdw_status: 0,
                qn2b: Quaternion::default(),
                uvw: Vector3::new(1.0, 0.0, 0.0),
                lla: [40.2, -111.6, 1410.0],
            }));
        }
        records
    }

    /// End-to-end: MockLink -> handshake -> StreamController -> dispatch -> sink
    #[tokio::test(flavor = "multi_thread")]
    async fn test_e2e_mock_pipeline() {
        let mut link = MockLink::new();
        let desired = matching_params(&link);

        let fanout = TelemetryFanout::with_handles(vec![SinkHandle::spawn(
            LogSink::new("e2e_log"),
            100,
        )]);
        let mut dispatcher =
            MessageDispatcher::new("body", StreamSettings::default(), false, fanout);

        // Bring-up
        let mut handshake = FlashConfigHandshake::new(fast_handshake());
        let outcome = handshake
            .run(&mut link, &mut dispatcher, &desired)
            .expect("handshake");
        assert_eq!(outcome, HandshakeOutcome::Confirmed);

        dispatcher.arm();
        let requests = StreamController::new(StreamSettings::default())
            .apply(&mut link)
            .expect("stream plan");
        assert!(requests > 0);

        // Stream the scripted session
        link.push_records(telemetry_batch(20));
        while let Some(record) = link.poll().expect("poll") {
            dispatcher.dispatch(record);
        }

        let stats = dispatcher.stats();
        // 2 gps + 20 iterations * (2 imu + 1 odometry)
        assert_eq!(stats.published, 2 + 20 * 3);
        assert_eq!(stats.dropped_unarmed, 0);
        assert!(dispatcher.gps_anchored());
        assert!(dispatcher.has_fix());

        dispatcher.shutdown().await;
    }

    /// Records that arrive before the handshake completes are dropped;
    /// identical records after arming are published.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_gating_around_handshake() {
        let mut link = MockLink::new();
        let desired = matching_params(&link);
        let mut dispatcher = MessageDispatcher::new(
            "body",
            StreamSettings::default(),
            false,
            TelemetryFanout::empty(),
        );

        // Sensor record before any flash config: silently dropped
        dispatcher.dispatch(gps_record(1.0));
        assert_eq!(dispatcher.stats().published, 0);
        assert_eq!(dispatcher.stats().dropped_unarmed, 1);

        let mut handshake = FlashConfigHandshake::new(fast_handshake());
        handshake
            .run(&mut link, &mut dispatcher, &desired)
            .expect("handshake");
        dispatcher.arm();

        // The identical record now produces exactly one published output
        dispatcher.dispatch(gps_record(1.0));
        assert_eq!(dispatcher.stats().published, 1);

        dispatcher.shutdown().await;
    }

    /// A device that never answers the flash request fails the bring-up
    /// with a caller-visible timeout; it does not idle un-armed forever.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_handshake_timeout_propagates() {
        let mut link = MockLink::with_config(MockLinkConfig {
            respond_flash: false,
            ..Default::default()
        });
        let mut dispatcher = MessageDispatcher::new(
            "body",
            StreamSettings::default(),
            false,
            TelemetryFanout::empty(),
        );

        let mut handshake = FlashConfigHandshake::new(fast_handshake());
        let err = handshake
            .run(&mut link, &mut dispatcher, &FlashParams::default())
            .unwrap_err();

        assert!(matches!(err, BridgeError::HandshakeTimeout { .. }));
        assert!(!dispatcher.is_armed());

        dispatcher.shutdown().await;
    }

    /// Loaded configuration drives the broadcast plan end to end.
    #[test]
    fn test_config_to_broadcast_plan() {
        let toml = r#"
[device]
port = "/dev/ttyUSB0"

[streams.ins]
enabled = true
rate_hz = 50

[streams.imu]
enabled = true
rate_hz = 100

[streams.preint_imu]
enabled = false
rate_hz = 100
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .expect("config");

        let plan = StreamController::new(blueprint.streams).broadcast_plan();
        let dual_imu = plan
            .iter()
            .find(|r| r.id == contracts::BroadcastId::DualImu)
            .expect("dual imu requested");
        // Shared broadcast honors the faster consumer (100 Hz -> 10 ms)
        assert_eq!(dual_imu.period_ms, 10);
    }
}
