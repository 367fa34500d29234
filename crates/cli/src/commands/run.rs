//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// How long a finite replay may sit idle before the run ends
const REPLAY_IDLE_LIMIT: Duration = Duration::from_secs(2);

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref port) = args.port {
        info!(port = %port, "Overriding serial port from CLI");
        blueprint.device.port = port.clone();
    }
    if let Some(baudrate) = args.baudrate {
        info!(baudrate, "Overriding baud rate from CLI");
        blueprint.device.baudrate = baudrate;
    }

    info!(
        port = %blueprint.device.port,
        baudrate = blueprint.device.baudrate,
        frame_id = %blueprint.device.frame_id,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Finite replays end when the log runs out instead of idling forever
    let idle_limit = match (&args.replay, args.replay_loop) {
        (Some(_), false) => Some(REPLAY_IDLE_LIMIT),
        _ => None,
    };

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_records: if args.max_records == 0 {
            None
        } else {
            Some(args.max_records)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        idle_limit,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        replay_path: args.replay.clone(),
        replay_loop: args.replay_loop,
        mock: args.mock,
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown: the ingest loop polls this flag
    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        signal_stop.store(true, Ordering::Relaxed);
    });

    info!("Starting pipeline...");

    // A handshake timeout surfaces here as a hard failure: the device is
    // unreachable and silently idling un-armed helps no one
    let stats = pipeline
        .run(stop)
        .await
        .context("Pipeline execution failed")?;

    info!(
        records_published = stats.records_published,
        duration_secs = stats.duration.as_secs_f64(),
        rps = format!("{:.2}", stats.records_per_second()),
        "Pipeline completed successfully"
    );

    stats.print_summary();

    info!("INS Bridge finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Device:");
    println!("  Port: {}", blueprint.device.port);
    println!("  Baudrate: {}", blueprint.device.baudrate);
    println!("  Frame id: {}", blueprint.device.frame_id);

    println!("\nStreams:");
    let streams = &blueprint.streams;
    for (name, toggle) in [
        ("ins", streams.ins),
        ("imu", streams.imu),
        ("gps", streams.gps),
        ("gps_info", streams.gps_info),
        ("magnetometer", streams.magnetometer),
        ("barometer", streams.barometer),
        ("preint_imu", streams.preint_imu),
    ] {
        println!(
            "  - {} {} @ {} Hz",
            name,
            if toggle.enabled { "on " } else { "off" },
            toggle.rate_hz
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!(
        "\nHandshake: response timeout {:.1}s, reset settle {:.1}s",
        blueprint.handshake.response_timeout_s, blueprint.handshake.reset_settle_s
    );

    println!();
}
