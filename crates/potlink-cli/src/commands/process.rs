//! Offline render of a WAV file through the effect chain.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use potlink_core::linear_to_db;
use potlink_io::{ControlPipeline, StereoSamples, WavSpec, read_wav_stereo, write_wav_stereo};
use potlink_platform::ParameterBridge;

use super::common::{load_settings, parse_cc};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Controller value to publish before rendering, e.g. `--cc 3=64`
    #[arg(long = "cc", value_parser = parse_cc, value_name = "N=V")]
    controls: Vec<(u8, u8)>,

    /// Raw serial capture to replay through the decoder before rendering
    #[arg(long, value_name = "FILE")]
    capture: Option<PathBuf>,

    /// Settings file for routes and stage defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Processing block size (default: from settings)
    #[arg(long)]
    block_size: Option<usize>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        matches!(args.bit_depth, 16 | 24 | 32),
        "unsupported bit depth {} (expected 16, 24 or 32)",
        args.bit_depth
    );
    let settings = load_settings(args.config.as_ref())?;
    let block_size = args.block_size.unwrap_or(settings.audio.block_size);

    eprintln!("Reading {}...", args.input.display());
    let (mut samples, spec) = read_wav_stereo(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    eprintln!(
        "  {} frames, {} Hz, {:.2}s",
        samples.len(),
        spec.sample_rate,
        samples.len() as f32 / spec.sample_rate as f32
    );

    let bridge = Arc::new(ParameterBridge::new());
    if let Some(path) = &args.capture {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading capture {}", path.display()))?;
        let mut pipeline = ControlPipeline::new(Arc::clone(&bridge));
        let published = pipeline.ingest(&bytes);
        let stats = pipeline.stats().snapshot();
        eprintln!(
            "Replayed {} bytes: {} control changes, {} unrecognized, {} overflowed",
            stats.bytes, published, stats.unrecognized, stats.overflows
        );
    }
    for &(controller, value) in &args.controls {
        bridge.publish(controller, value);
    }

    let mut chain = settings.build_chain(bridge)?;
    chain.configure(spec.sample_rate as f32, block_size)?;

    let input_peak = peak(&samples);
    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let StereoSamples { left, right } = &mut samples;
    for (l, r) in left.chunks_mut(block_size).zip(right.chunks_mut(block_size)) {
        chain.process_block_stereo(l, r);
        pb.inc(l.len() as u64);
    }
    pb.finish_and_clear();

    eprintln!(
        "Peak: input {:.1} dB, output {:.1} dB",
        linear_to_db(input_peak),
        linear_to_db(peak(&samples))
    );

    let out_spec = WavSpec {
        channels: 2,
        sample_rate: spec.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    eprintln!("Writing {}...", args.output.display());
    write_wav_stereo(&args.output, &samples, out_spec)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}

fn peak(samples: &StereoSamples) -> f32 {
    samples
        .left
        .iter()
        .chain(&samples.right)
        .fold(0.0, |m, s| s.abs().max(m))
}
