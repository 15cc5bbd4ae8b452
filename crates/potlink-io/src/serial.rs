//! The serial link thread.
//!
//! [`SerialLinkDriver`] owns one background thread that reads the controller
//! board and feeds a [`ControlPipeline`]. Reads block for at most
//! `read_timeout`, so the thread notices a stop request within one timeout.
//! When the link drops the port is closed, and the thread either retries
//! the open every `reconnect_interval` or ends in [`LinkStatus::Failed`].
//!
//! The transport is abstracted behind [`LinkOpener`]; the production
//! implementation is [`SerialPortOpener`].

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use potlink_platform::{ControlEvent, ParameterBridge};

use crate::pipeline::{ControlPipeline, LinkStats};
use crate::{Error, Result};

/// Bytes requested per read.
const READ_CHUNK: usize = 64;

/// Longest sleep between stop-flag checks while waiting to reconnect.
const STOP_POLL: Duration = Duration::from_millis(10);

/// Settings for one serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLinkConfig {
    /// Device path or name.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Upper bound on a single blocking read.
    pub read_timeout: Duration,
    /// Delay between reopen attempts after link loss; `None` gives up.
    pub reconnect_interval: Option<Duration>,
    /// How long [`SerialLinkDriver::stop`] waits for the thread.
    pub join_timeout: Duration,
}

impl SerialLinkConfig {
    /// Defaults for `port`: 9600 baud, 50 ms reads, reconnect every second.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(50),
            reconnect_interval: Some(Duration::from_secs(1)),
            join_timeout: Duration::from_millis(500),
        }
    }
}

/// Opens a byte stream to the controller.
///
/// Each call yields a fresh connection; the driver drops the previous one
/// before asking for another. Reads on the returned stream should time out
/// with [`io::ErrorKind::TimedOut`] rather than block indefinitely.
pub trait LinkOpener: Send + 'static {
    /// Open the link.
    fn open(&mut self) -> Result<Box<dyn Read + Send>>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// [`LinkOpener`] for a real serial port.
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    port: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialPortOpener {
    /// Opener for the port described by `config`.
    pub fn new(config: &SerialLinkConfig) -> Self {
        Self {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
            read_timeout: config.read_timeout,
        }
    }
}

struct SerialLink(Box<dyn serialport::SerialPort>);

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl LinkOpener for SerialPortOpener {
    fn open(&mut self) -> Result<Box<dyn Read + Send>> {
        let port = serialport::new(&self.port, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|source| Error::LinkOpen {
                port: self.port.clone(),
                source,
            })?;
        Ok(Box::new(SerialLink(port)))
    }

    fn name(&self) -> &str {
        &self.port
    }
}

/// Link thread state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkStatus {
    /// Reading from an open link.
    Connected = 0,
    /// Link lost; retrying the open.
    Reconnecting = 1,
    /// Stopped on request.
    Stopped = 2,
    /// Link lost with reconnect disabled; the thread has ended.
    Failed = 3,
}

impl LinkStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connected,
            1 => Self::Reconnecting,
            2 => Self::Stopped,
            _ => Self::Failed,
        }
    }

    /// True once the thread has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

struct Shared {
    stop: AtomicBool,
    status: AtomicU8,
    stats: Arc<LinkStats>,
}

impl Shared {
    fn set_status(&self, status: LinkStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Handle to the link thread.
///
/// Dropping the handle stops the thread.
pub struct SerialLinkDriver {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    exited: Receiver<()>,
    join_timeout: Duration,
    name: String,
}

impl SerialLinkDriver {
    /// Open `config.port` and start reading it into `bridge`.
    ///
    /// The first open happens on the calling thread, so a missing device is
    /// reported here as [`Error::LinkOpen`].
    pub fn start(config: SerialLinkConfig, bridge: Arc<ParameterBridge>) -> Result<Self> {
        let opener = SerialPortOpener::new(&config);
        Self::spawn_with(opener, &config, bridge, None)
    }

    /// Start a link over any transport. `tap`, if given, receives every
    /// decoded Control Change.
    pub fn spawn_with<O: LinkOpener>(
        mut opener: O,
        config: &SerialLinkConfig,
        bridge: Arc<ParameterBridge>,
        tap: Option<Sender<ControlEvent>>,
    ) -> Result<Self> {
        let name = opener.name().to_string();
        let link = opener.open()?;
        tracing::info!(port = %name, baud = config.baud_rate, "serial link open");

        let stats = Arc::new(LinkStats::default());
        let mut pipeline = ControlPipeline::with_stats(bridge, Arc::clone(&stats));
        if let Some(tap) = tap {
            pipeline = pipeline.with_tap(tap);
        }

        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            status: AtomicU8::new(LinkStatus::Connected as u8),
            stats,
        });
        let (exit_tx, exited) = crossbeam_channel::bounded(1);

        let worker = LinkWorker {
            opener,
            pipeline,
            shared: Arc::clone(&shared),
            reconnect: config.reconnect_interval,
        };
        let span_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("potlink-link-{name}"))
            .spawn(move || {
                let mut worker = worker;
                let span = tracing::info_span!("serial_link", port = %span_name);
                let _enter = span.enter();
                let status = worker.run(link);
                worker.shared.set_status(status);
                tracing::info!(?status, "link thread exiting");
                let _ = exit_tx.send(());
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
            exited,
            join_timeout: config.join_timeout,
            name,
        })
    }

    /// Current state of the link thread.
    pub fn status(&self) -> LinkStatus {
        LinkStatus::from_u8(self.shared.status.load(Ordering::Acquire))
    }

    /// Link counters.
    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.shared.stats
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the thread to stop and wait up to the join timeout for it.
    ///
    /// On timeout the thread is detached; it exits at its next stop check.
    /// Calling `stop` again after it has returned is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.stop.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        match self.exited.recv_timeout(self.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::error!(port = %self.name, "link thread panicked");
                    self.shared.set_status(LinkStatus::Failed);
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(port = %self.name, timeout = ?self.join_timeout, "link thread did not stop; detaching");
                Err(Error::JoinTimeout(self.join_timeout))
            }
        }
    }
}

impl Drop for SerialLinkDriver {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(port = %self.name, error = %e, "link shutdown incomplete");
        }
    }
}

impl std::fmt::Debug for SerialLinkDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLinkDriver")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

enum SessionEnd {
    Stopped,
    Lost(String),
}

struct LinkWorker<O> {
    opener: O,
    pipeline: ControlPipeline,
    shared: Arc<Shared>,
    reconnect: Option<Duration>,
}

impl<O: LinkOpener> LinkWorker<O> {
    fn run(&mut self, first: Box<dyn Read + Send>) -> LinkStatus {
        let mut link = Some(first);
        loop {
            if let Some(mut port) = link.take() {
                match self.read_session(port.as_mut()) {
                    SessionEnd::Stopped => return LinkStatus::Stopped,
                    SessionEnd::Lost(reason) => {
                        self.shared.stats.record_disconnect();
                        tracing::warn!(%reason, "serial link lost");
                    }
                }
                // port closes here
            }

            let Some(interval) = self.reconnect else {
                tracing::error!("reconnect disabled, giving up");
                return LinkStatus::Failed;
            };
            self.shared.set_status(LinkStatus::Reconnecting);
            self.pipeline.reset();
            if self.sleep_unless_stopped(interval) {
                return LinkStatus::Stopped;
            }

            match self.opener.open() {
                Ok(port) => {
                    tracing::info!("serial link reopened");
                    self.shared.set_status(LinkStatus::Connected);
                    link = Some(port);
                }
                Err(e) => tracing::debug!(error = %e, "reopen failed"),
            }
        }
    }

    fn read_session(&mut self, port: &mut (dyn Read + Send)) -> SessionEnd {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if self.shared.stopping() {
                return SessionEnd::Stopped;
            }
            match port.read(&mut buf) {
                Ok(0) => return SessionEnd::Lost("end of stream".to_string()),
                Ok(n) => {
                    self.pipeline.ingest(&buf[..n]);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return SessionEnd::Lost(e.to_string()),
            }
        }
    }

    /// Returns true if a stop was requested during the wait.
    fn sleep_unless_stopped(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if self.shared.stopping() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(STOP_POLL.min(deadline - now));
        }
    }
}

/// A serial device visible to the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or name, as accepted by [`SerialLinkConfig::new`].
    pub name: String,
    /// Product or transport description.
    pub description: String,
}

/// List serial ports.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("USB {product} ({:04x}:{:04x})", usb.vid, usb.pid),
                    None => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
                },
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "unknown".to_string(),
            };
            PortInfo {
                name: p.port_name,
                description,
            }
        })
        .collect())
}
