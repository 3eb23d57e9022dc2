//! `synth` command implementation.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use contracts::{ImuRawData, MipiBatch, MipiFormat, RawPacket, SensorGeometry, IMU_RAW_LEN};
use ingestion::MipiPacketWriter;
use tracing::info;

use crate::capture::CaptureWriter;
use crate::cli::SynthArgs;

/// Microseconds between synthetic batches
const BATCH_INTERVAL_US: i64 = 1_000;

/// Execute the `synth` command
pub fn run_synth(args: &SynthArgs) -> Result<()> {
    let format = MipiFormat::from_tag(args.format)
        .with_context(|| format!("unknown MIPI format tag {}", args.format))?;
    if args.full_frame && !format.carries_adc() {
        bail!("full-frame captures need a format with ADC data (0 or 1)");
    }
    let geometry = SensorGeometry::new(args.rows, args.cols);

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = CaptureWriter::new(BufWriter::new(file))?;

    let mut clock = 0i32;
    for index in 0..args.batches {
        let data = if args.full_frame {
            full_frame_batch(format, geometry, index, clock)
        } else {
            event_batch(format, geometry, args, index, &mut clock)
        };
        let end_timestamp_us = (index as i64 + 1) * BATCH_INTERVAL_US;
        let batch = MipiBatch::new(RawPacket::new(data, format.tag()), end_timestamp_us)
            .with_imu(imu_samples(args.imu_per_batch, index));
        writer.write_batch(&batch)?;
    }

    let records = writer.records();
    writer.finish()?;
    info!(
        path = %args.output.display(),
        records,
        format = %format,
        full_frame = args.full_frame,
        "synthetic capture written"
    );
    println!("Wrote {} batches to {}", records, args.output.display());
    Ok(())
}

/// One timestamp step per row; columns sweep across the array
fn event_batch(
    format: MipiFormat,
    geometry: SensorGeometry,
    args: &SynthArgs,
    index: u32,
    clock: &mut i32,
) -> bytes::Bytes {
    let mut writer = MipiPacketWriter::new(format);
    for r in 0..args.rows_per_batch {
        let row = ((index * args.rows_per_batch + r) % geometry.rows as u32) as u16;
        *clock = (*clock + 1) % format.t_modulus();
        writer.row(row, *clock);
        for e in 0..args.events_per_row {
            let col = ((r * 37 + e as u32 * 131 + index * 7) % geometry.cols as u32) as u16;
            let adc = ((row as u32 * 3 + col as u32) % 4096) as u16;
            writer.event(col, Some(adc));
        }
    }
    writer.finish()
}

/// A gradient plus a per-column offset, so calibration has something to find
fn full_frame_batch(
    format: MipiFormat,
    geometry: SensorGeometry,
    index: u32,
    clock: i32,
) -> bytes::Bytes {
    let mut writer = MipiPacketWriter::new(format);
    let jitter = (index % 3) as u16;
    writer.full_frame(geometry, clock, |row, col| {
        1_000 + (row % 64) * 8 + (col % 8) * 20 + jitter
    });
    writer.finish()
}

fn imu_samples(count: u16, index: u32) -> Vec<ImuRawData> {
    (0..count)
        .map(|i| {
            let words: [i16; 10] = [
                131 * ((index % 3) as i16),
                -131,
                0,
                0,
                0,
                16_384,
                100,
                0,
                0,
                i as i16,
            ];
            let mut bytes = [0u8; IMU_RAW_LEN];
            for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
                chunk.copy_from_slice(&word.to_be_bytes());
            }
            ImuRawData::new(bytes)
        })
        .collect()
}
