//! `fpn` command implementation.

use anyhow::{bail, Context, Result};
use contracts::{PacketSource, SensorMode};
use processor::{DataProcessor, FpnOutcome};
use tracing::{info, warn};

use crate::capture::CaptureSource;
use crate::cli::FpnArgs;

/// Execute the `fpn` command
pub async fn run_fpn(args: &FpnArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    // 标定使用原始 ADC，不加载已有的 FPN 表
    config.fpn.path = None;
    config.mode.fixed = SensorMode::FullPicture;
    config.mode.loop_enabled = false;

    let mut processor = DataProcessor::new(config).context("Failed to create data processor")?;
    processor
        .generate_fpn_over(&args.output, args.frames)
        .with_context(|| format!("Cannot calibrate into {}", args.output.display()))?;

    let mut source = CaptureSource::open(&args.input)
        .await
        .with_context(|| format!("Failed to open capture {}", args.input.display()))?;
    info!(source = source.name(), frames = args.frames, "fpn calibration started");

    while let Some(batch) = source.next_batch().await? {
        let report = processor.process_mipi_data(&batch);
        if let Some(error) = &report.decode_error {
            warn!(error = %error, "decode error during calibration");
        }
        match report.fpn {
            Some(FpnOutcome::Progress {
                frames_seen,
                frames_target,
            }) => info!(frames_seen, frames_target, "calibration frame accumulated"),
            Some(FpnOutcome::Completed { path }) => {
                println!("FPN table written to {}", path.display());
                return Ok(());
            }
            Some(FpnOutcome::Failed { message }) => bail!("FPN calibration failed: {message}"),
            None => {}
        }
    }

    bail!(
        "capture ended after {} batches, before {} full frames were seen",
        source.batches_read(),
        args.frames
    )
}
