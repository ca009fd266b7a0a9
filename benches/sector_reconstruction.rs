//! Benchmarks for full-capture analysis
//!
//! Measures, on synthetic captures of increasing length:
//! - Lap segmentation alone
//! - Sector reconstruction alone
//! - The whole capture pipeline (decode, metadata, laps, sectors, purple laps)
//!
//! Platform: Cross-platform (synthetic captures, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pitlog::analysis::{reconstruct_sectors, segment_laps};
use pitlog::test_utils::CaptureBuilder;
use pitlog::{AnalysisConfig, CaptureReader, process_bytes};
use std::hint::black_box;

const STARTS: [f64; 3] = [0.0, 0.33, 0.66];
const LAP_COUNTS: [i32; 3] = [10, 100, 1000];

/// Capture with `laps` laps sampled at 60 Hz between scripted crossings
fn build_capture(laps: i32) -> Vec<u8> {
    let mut builder = CaptureBuilder::timing();
    for lap in 1..=laps {
        let jitter = f64::from(lap % 7) * 0.05;
        builder.lap(lap, &[30.0 + jitter, 30.1, 30.1 - jitter]);
        if lap % 25 == 0 {
            builder.incident();
        }
    }
    builder.finish();
    builder.build()
}

fn bench_lap_segmentation(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("lap_segmentation");

    for laps in LAP_COUNTS {
        let bytes = build_capture(laps);
        let reader = CaptureReader::from_bytes(&bytes).expect("Failed to decode capture");
        group.throughput(Throughput::Elements(reader.total_samples() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(laps), &reader, |b, reader| {
            b.iter(|| {
                let summary = segment_laps(reader.variables(), &reader.accessor(), &config)
                    .expect("Lap channels present");
                black_box(summary)
            })
        });
    }

    group.finish();
}

fn bench_sector_reconstruction(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("sector_reconstruction");

    for laps in LAP_COUNTS {
        let bytes = build_capture(laps);
        let reader = CaptureReader::from_bytes(&bytes).expect("Failed to decode capture");
        group.throughput(Throughput::Elements(reader.total_samples() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(laps), &reader, |b, reader| {
            b.iter(|| {
                let sets =
                    reconstruct_sectors(reader.variables(), &reader.accessor(), &STARTS, &config);
                black_box(sets)
            })
        });
    }

    group.finish();
}

fn bench_capture_pipeline(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("capture_pipeline");
    group.sample_size(20);

    for laps in LAP_COUNTS {
        let bytes = build_capture(laps);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(laps), &bytes, |b, bytes| {
            b.iter(|| {
                let outcome = process_bytes(
                    bytes.clone(),
                    "ferrari296gt3_monza 2024-09-13 11-43-43.ibt",
                    &config,
                );
                black_box(outcome)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_lap_segmentation,
    bench_sector_reconstruction,
    bench_capture_pipeline
);
criterion_main!(benches);
