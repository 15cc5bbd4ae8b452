//! Live processing: serial link, effect chain and duplex audio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use potlink_io::{AudioStream, LinkStatus, SerialLinkDriver, StreamConfig};
use potlink_platform::ParameterBridge;

use super::common::{LinkArgs, link_config};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    link: LinkArgs,

    /// Input device (name substring)
    #[arg(short, long)]
    input: Option<String>,

    /// Output device (name substring)
    #[arg(short, long)]
    output: Option<String>,

    /// Sample rate in Hz (overrides the settings file)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Save the effective settings to this file and exit
    #[arg(long, value_name = "FILE")]
    save_config: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut settings = args.link.settings()?;
    if let Some(sr) = args.sample_rate {
        settings.audio.sample_rate = sr;
    }
    if args.input.is_some() {
        settings.audio.input_device = args.input;
    }
    if args.output.is_some() {
        settings.audio.output_device = args.output;
    }
    if let Some(path) = &args.save_config {
        settings.save(path)?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let bridge = Arc::new(ParameterBridge::new());
    let link_config = link_config(&settings);
    let link = match SerialLinkDriver::start(link_config, Arc::clone(&bridge)) {
        Ok(link) => Some(link),
        Err(e) => {
            tracing::warn!(error = %e, "serial link unavailable; running with default parameters");
            None
        }
    };

    let mut stream = AudioStream::new(StreamConfig {
        sample_rate: settings.audio.sample_rate,
        buffer_size: settings.audio.block_size as u32,
        input_device: settings.audio.input_device.clone(),
        output_device: settings.audio.output_device.clone(),
    })?;

    let mut chain = settings.build_chain(bridge)?;
    chain.configure(stream.sample_rate() as f32, settings.audio.block_size)?;

    let stop = stream.stop_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        stop.stop();
    })?;

    eprintln!("Running. Press Ctrl+C to stop.");
    stream.run_stereo(move |in_l, in_r, out_l, out_r| {
        out_l.copy_from_slice(in_l);
        out_r.copy_from_slice(in_r);
        chain.process_block_stereo(out_l, out_r);
    })?;

    if let Some(link) = link {
        close_link(link);
    }
    Ok(())
}

/// Stop the link thread once audio is down. A thread that outlives its
/// join deadline is logged, not fatal: the stream already stopped cleanly.
fn close_link(mut link: SerialLinkDriver) -> LinkStatus {
    let stats = link.stats().snapshot();
    if let Err(e) = link.stop() {
        tracing::warn!(error = %e, "serial link did not stop cleanly");
    }
    tracing::info!(
        control_changes = stats.control_changes,
        disconnects = stats.disconnects,
        "serial link closed"
    );
    link.status()
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};
    use std::thread;
    use std::time::{Duration, Instant};

    use potlink_io::{LinkOpener, SerialLinkConfig};

    use super::*;

    struct StalledLink;

    impl Read for StalledLink {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_millis(200));
            Err(io::ErrorKind::TimedOut.into())
        }
    }

    struct StalledOpener;

    impl LinkOpener for StalledOpener {
        fn open(&mut self) -> potlink_io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(StalledLink))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[test]
    fn close_link_tolerates_join_timeout() {
        let config = SerialLinkConfig {
            join_timeout: Duration::from_millis(10),
            ..SerialLinkConfig::new("stalled")
        };
        let bridge = Arc::new(ParameterBridge::new());
        let link = SerialLinkDriver::spawn_with(StalledOpener, &config, bridge, None).unwrap();
        thread::sleep(Duration::from_millis(5));

        let started = Instant::now();
        let status = close_link(link);
        assert_ne!(status, LinkStatus::Stopped);
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}
