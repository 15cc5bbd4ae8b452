//! Serial monitor: print control changes as they arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use potlink_io::{SerialLinkDriver, SerialPortOpener};
use potlink_platform::ParameterBridge;

use super::common::{LinkArgs, link_config};

#[derive(Args)]
pub struct MonitorArgs {
    #[command(flatten)]
    link: LinkArgs,
}

pub fn run(args: MonitorArgs) -> anyhow::Result<()> {
    let settings = args.link.settings()?;
    let config = link_config(&settings);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let (tx, rx) = crossbeam_channel::bounded(1024);
    let bridge = Arc::new(ParameterBridge::new());
    let mut link =
        SerialLinkDriver::spawn_with(SerialPortOpener::new(&config), &config, bridge, Some(tx))?;

    eprintln!("Listening on {} at {} baud. Press Ctrl+C to stop.", config.port, config.baud_rate);

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => println!("{event}"),
            Err(RecvTimeoutError::Timeout) => {
                if link.status().is_terminal() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = link.status();
    link.stop()?;
    let stats = link.stats().snapshot();
    tracing::info!(
        ?status,
        frames = stats.frames,
        control_changes = stats.control_changes,
        unrecognized = stats.unrecognized,
        overflows = stats.overflows,
        "monitor finished"
    );
    Ok(())
}
