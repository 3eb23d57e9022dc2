//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{LoopSlot, ProcessorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    config: &'a ProcessorConfig,
    pixel_count: usize,
    units_per_ms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_time_units: Option<u32>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");
    let config = super::load_config(args.config.as_deref())?;

    if args.json {
        let info = ConfigInfo {
            config: &config,
            pixel_count: config.sensor.geometry().pixel_count(),
            units_per_ms: config.event.units_per_ms(),
            frame_time_units: config.event.frame_time_units(),
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }
    Ok(())
}

fn print_config_info(config: &ProcessorConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CeleX MIPI Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let geometry = config.sensor.geometry();
    println!("📷 Sensor");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Geometry: {} rows x {} cols", geometry.rows, geometry.cols);
    println!("   ├─ Pixels: {}", geometry.pixel_count());
    println!("   └─ MIPI format tag: {}", config.sensor.mipi_format);

    let mode = &config.mode;
    println!("\n🔁 Mode");
    println!("   ├─ Fixed: {}", mode.fixed);
    if mode.loop_enabled {
        println!("   ├─ Loop: enabled");
        for slot in [LoopSlot::A, LoopSlot::B, LoopSlot::C] {
            println!("   │  ├─ Slot {}: {}", slot.index(), mode.loop_mode(slot));
        }
    } else {
        println!("   ├─ Loop: disabled");
    }
    println!("   └─ ISO level: {}", mode.iso_level);

    let event = &config.event;
    println!("\n⚡ Event framing");
    println!("   ├─ Clock: {} MHz ({} units/ms)", event.clock_mhz, event.units_per_ms());
    println!("   ├─ Show: {:?}", event.show);
    if let Some(units) = event.frame_time_units() {
        println!("   ├─ Frame time: {} units", units);
    }
    println!("   ├─ Start position: {}", event.start_pos);
    println!("   ├─ Count step: {}", event.count_step);
    println!("   └─ Rotation: {}°", event.rotation.degrees());

    println!("\n⚙️  Modules");
    println!("   ├─ Frame: {}", config.modules.frame);
    println!("   └─ IMU: {}", config.modules.imu);

    println!("\n🧮 FPN");
    match &config.fpn.path {
        Some(path) => println!("   └─ Table: {}", path.display()),
        None => println!("   └─ Table: (none, zero offsets)"),
    }

    println!();
}
