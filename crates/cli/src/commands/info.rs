//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;

use contracts::BroadcastRequest;
use provisioning::StreamController;

use crate::cli::InfoArgs;

#[derive(Serialize)]
struct ConfigInfo {
    config_path: String,
    port: String,
    baudrate: u32,
    frame_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcast_plan: Option<Vec<BroadcastRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sinks: Option<Vec<SinkInfo>>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let broadcast_plan = args
        .streams
        .then(|| StreamController::new(blueprint.streams.clone()).broadcast_plan());

    let sinks = args.sinks.then(|| {
        blueprint
            .sinks
            .iter()
            .map(|sink| SinkInfo {
                name: sink.name.clone(),
                sink_type: format!("{:?}", sink.sink_type),
                queue_capacity: sink.queue_capacity,
            })
            .collect::<Vec<_>>()
    });

    let info = ConfigInfo {
        config_path: args.config.display().to_string(),
        port: blueprint.device.port.clone(),
        baudrate: blueprint.device.baudrate,
        frame_id: blueprint.device.frame_id.clone(),
        broadcast_plan,
        sinks,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize info")?
        );
    } else {
        print_info(&info);
    }

    Ok(())
}

fn print_info(info: &ConfigInfo) {
    println!("Configuration: {}", info.config_path);
    println!("  Port: {}", info.port);
    println!("  Baudrate: {}", info.baudrate);
    println!("  Frame id: {}", info.frame_id);

    if let Some(ref plan) = info.broadcast_plan {
        println!("\nBroadcast plan ({} requests):", plan.len());
        for request in plan {
            println!("  - {:?} every {} ms", request.id, request.period_ms);
        }
    }

    if let Some(ref sinks) = info.sinks {
        println!("\nSinks ({}):", sinks.len());
        for sink in sinks {
            println!(
                "  - {} ({}) queue={}",
                sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }
}
