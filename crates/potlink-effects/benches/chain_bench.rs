//! Criterion benchmarks for the effect stages and the full chain.
//!
//! Run with: cargo bench -p potlink-effects

#![allow(missing_docs)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use potlink_core::Effect;
use potlink_effects::{EffectChain, EffectStage, StageKind};
use potlink_platform::ParameterBridge;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: [usize; 3] = [64, 256, 1024];

fn signal(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.01).sin() * 0.5).collect()
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stage");
    let kinds = [
        StageKind::Compressor,
        StageKind::Gain,
        StageKind::Chorus,
        StageKind::Delay,
        StageKind::Reverb,
    ];
    for kind in kinds {
        let mut stage = EffectStage::new(kind, SAMPLE_RATE);
        let input = signal(256);
        let mut buf = input.clone();
        group.throughput(Throughput::Elements(256));
        group.bench_function(BenchmarkId::new(kind.name(), 256), |b| {
            b.iter(|| {
                buf.copy_from_slice(&input);
                stage.process_block_inplace(black_box(&mut buf));
            });
        });
    }
    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("EffectChain");
    for &size in &BLOCK_SIZES {
        let bridge = Arc::new(ParameterBridge::new());
        let mut chain = EffectChain::new(Arc::clone(&bridge));
        let _ = chain.configure(SAMPLE_RATE, size);
        let input = signal(size);
        let mut buf = input.clone();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("idle_controls", size), &size, |b, _| {
            b.iter(|| {
                buf.copy_from_slice(&input);
                chain.process_block(black_box(&mut buf));
            });
        });

        let mut raw = 0u8;
        group.bench_with_input(BenchmarkId::new("moving_controls", size), &size, |b, _| {
            b.iter(|| {
                raw = (raw + 1) % 128;
                for cc in 1..=21u8 {
                    bridge.publish(cc, raw);
                }
                buf.copy_from_slice(&input);
                chain.process_block(black_box(&mut buf));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stages, bench_chain);
criterion_main!(benches);
