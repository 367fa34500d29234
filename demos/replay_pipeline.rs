//! Replay Pipeline Demo
//!
//! Replays a recorded JSON-lines record log through the bridge and writes
//! the published telemetry to a JSON-lines sink.
//!
//! Run with: cargo run --bin replay_pipeline -- <records.jsonl>

use std::collections::HashMap;
use std::path::Path;

use contracts::{DeviceLink, FlashParams, HandshakeConfig, SinkConfig, SinkType, StreamSettings};
use device_link::{ReplayConfig, ReplayLink};
use dispatcher::{create_fanout, MessageDispatcher};
use provisioning::{FlashConfigHandshake, StreamController};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay_pipeline <records.jsonl>")?;

    tracing::info!(path = %path, "Starting Replay Pipeline Demo");

    let mut link = ReplayLink::open(Path::new(&path), ReplayConfig::default())?;

    // Publish everything to a jsonl sink under ./output
    let sinks = vec![SinkConfig {
        name: "jsonl".to_string(),
        sink_type: SinkType::Jsonl,
        queue_capacity: 256,
        params: HashMap::new(),
    }];
    let fanout = create_fanout(&sinks).await?;
    let mut dispatcher = MessageDispatcher::new("body", StreamSettings::default(), false, fanout);

    let mut handshake = FlashConfigHandshake::new(HandshakeConfig::default());
    let outcome = handshake.run(&mut link, &mut dispatcher, &FlashParams::default())?;
    tracing::info!(?outcome, "handshake complete");

    dispatcher.arm();
    StreamController::new(StreamSettings::default()).apply(&mut link)?;

    while let Some(record) = link.poll()? {
        dispatcher.dispatch(record);
    }

    let stats = dispatcher.stats();
    tracing::info!(
        received = stats.received,
        published = stats.published,
        unparsed = stats.unparsed,
        "replay complete"
    );

    dispatcher.shutdown().await;
    Ok(())
}
