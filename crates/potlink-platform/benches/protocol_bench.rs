//! Criterion benchmarks for the control protocol and parameter bridge
//!
//! Run with: cargo bench -p potlink-platform
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use potlink_platform::{BridgeSnapshot, FrameDecoder, ParameterBridge, translate};

const FRAME_COUNTS: &[usize] = &[16, 256, 4096];

/// A stream of well-formed frames sweeping 22 controllers.
fn control_stream(frames: usize) -> Vec<u8> {
    (0..frames)
        .flat_map(|i| [0xB0, (i % 22) as u8, (i % 128) as u8, 0xFF])
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("FrameDecoder");

    for &frames in FRAME_COUNTS {
        let stream = control_stream(frames);
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode_translate", frames), &stream, |b, s| {
            let mut decoder = FrameDecoder::new();
            b.iter(|| {
                for frame in decoder.feed_bytes(black_box(s)) {
                    black_box(translate(&frame));
                }
            });
        });
    }

    group.finish();
}

fn bench_bridge(c: &mut Criterion) {
    let mut group = c.benchmark_group("ParameterBridge");
    let bridge = ParameterBridge::new();
    for i in 0..22u8 {
        bridge.publish(i, i * 5);
    }

    group.bench_function("publish", |b| {
        let mut raw = 0u8;
        b.iter(|| {
            raw = (raw + 1) & 0x7F;
            black_box(bridge.publish(black_box(7), raw));
        });
    });

    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(bridge.snapshot(black_box(7))));
    });

    group.bench_function("read_all", |b| {
        let mut snap = BridgeSnapshot::new();
        b.iter(|| {
            bridge.read_all(&mut snap);
            black_box(&snap);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_bridge);
criterion_main!(benches);
