//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(mode) = args.mode {
        info!(mode = %mode, "Overriding fixed mode from CLI");
        config.mode.fixed = mode;
        config.mode.loop_enabled = false;
    }
    if let Some(ref fpn) = args.fpn {
        info!(path = %fpn.display(), "Overriding FPN table from CLI");
        config.fpn.path = Some(fpn.clone());
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid configuration")?;

    info!(
        rows = config.sensor.rows,
        cols = config.sensor.cols,
        mode = %config.mode.fixed,
        loop_enabled = config.mode.loop_enabled,
        show = ?config.event.show,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        processor: config,
        input: args.input.clone(),
        output: args.output.clone(),
        event_format: args.event_format.into(),
        queue_capacity: args.queue_capacity,
        max_batches: (args.max_batches > 0).then_some(args.max_batches),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Pipeline execution failed")?;
            info!(
                batches = stats.batches,
                frames = stats.publish.frames,
                duration_secs = stats.duration.as_secs_f64(),
                fps = format!("{:.2}", stats.fps()),
                "Pipeline completed successfully"
            );
            stats.print_summary();
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("celex-mipi finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::ProcessorConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sensor: {}x{} (format tag {})", config.sensor.rows, config.sensor.cols, config.sensor.mipi_format);
    if config.mode.loop_enabled {
        println!(
            "Loop: {} -> {} -> {}",
            config.mode.loop_a, config.mode.loop_b, config.mode.loop_c
        );
    } else {
        println!("Mode: {}", config.mode.fixed);
    }
    println!("Event show: {:?}", config.event.show);
    println!(
        "Modules: frame={} imu={}",
        config.modules.frame, config.modules.imu
    );
    if let Some(ref path) = config.fpn.path {
        println!("FPN: {}", path.display());
    }
    println!();
}
