//! Host-side I/O for potlink.
//!
//! - **Serial link**: [`SerialLinkDriver`] owns the thread that reads the
//!   controller board and publishes into a
//!   [`ParameterBridge`](potlink_platform::ParameterBridge) through a
//!   [`ControlPipeline`].
//! - **WAV file I/O**: [`read_wav_stereo`] and [`write_wav_stereo`] for
//!   offline rendering.
//! - **Real-time streaming**: [`AudioStream`] for live duplex audio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use potlink_io::{SerialLinkConfig, SerialLinkDriver};
//! use potlink_platform::ParameterBridge;
//!
//! let bridge = Arc::new(ParameterBridge::new());
//! let mut link = SerialLinkDriver::start(SerialLinkConfig::new("/dev/ttyACM0"), bridge)?;
//! // ... run audio, reading the bridge once per block ...
//! link.stop()?;
//! # Ok::<(), potlink_io::Error>(())
//! ```

mod pipeline;
mod serial;
mod stream;
mod wav;

use std::time::Duration;

pub use pipeline::{ControlPipeline, LinkStats, LinkStatsSnapshot};
pub use serial::{
    LinkOpener, LinkStatus, PortInfo, SerialLinkConfig, SerialLinkDriver, SerialPortOpener,
    available_ports,
};
pub use stream::{AudioDevice, AudioStream, StopHandle, StreamConfig, list_devices};
pub use wav::{StereoSamples, WavSpec, read_wav_stereo, write_wav_stereo};

/// Error types for link and audio I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial port could not be opened.
    #[error("cannot open serial port {port}: {source}")]
    LinkOpen {
        /// Port name as configured.
        port: String,
        /// Underlying error.
        #[source]
        source: serialport::Error,
    },

    /// Serial port enumeration or configuration error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The link thread did not exit in time; it has been detached.
    #[error("link thread did not stop within {0:?}")]
    JoinTimeout(Duration),
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
