//! Real-time duplex audio via cpal.
//!
//! The input callback pushes interleaved samples into an `rtrb` ring; the
//! output callback pops them, splits them into left and right scratch
//! buffers allocated up front, runs the processing closure and interleaves
//! the result. Neither callback allocates or locks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Host, SampleRate, Stream};

use crate::{Error, Result};

/// Largest block handed to the processing closure; longer callbacks are
/// split.
const MAX_CALLBACK_FRAMES: usize = 4096;

/// Ring capacity in callback buffers.
const RING_BUFFERS: usize = 8;

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Device name as reported by the host.
    pub name: String,
    /// Whether the device has inputs.
    pub is_input: bool,
    /// Whether the device has outputs.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Input device name (substring match); default device if `None`.
    pub input_device: Option<String>,
    /// Output device name (substring match); default device if `None`.
    pub output_device: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            input_device: None,
            output_device: None,
        }
    }
}

/// List all audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDevice> = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            let Ok(name) = device.name() else { continue };
            devices.push(AudioDevice {
                default_sample_rate: device
                    .default_input_config()
                    .map_or(48000, |c| c.sample_rate().0),
                is_output: device.default_output_config().is_ok(),
                is_input: true,
                name,
            });
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let Ok(name) = device.name() else { continue };
            if devices.iter().any(|d| d.name == name) {
                continue;
            }
            devices.push(AudioDevice {
                default_sample_rate: device
                    .default_output_config()
                    .map_or(48000, |c| c.sample_rate().0),
                is_input: false,
                is_output: true,
                name,
            });
        }
    }

    Ok(devices)
}

fn find_device<I>(devices: I, search: &str, kind: &str) -> Result<Device>
where
    I: Iterator<Item = Device>,
{
    let needle = search.to_lowercase();
    devices
        .into_iter()
        .find(|d| d.name().is_ok_and(|n| n.to_lowercase().contains(&needle)))
        .ok_or_else(|| Error::DeviceNotFound(format!("no {kind} device matching '{search}'")))
}

/// Stops a running [`AudioStream`] from another thread.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request the stream to stop; [`AudioStream::run_stereo`] returns soon
    /// after.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Real-time duplex audio stream.
pub struct AudioStream {
    #[allow(dead_code)]
    host: Host,
    input_device: Device,
    output_device: Device,
    config: StreamConfig,
    running: Arc<AtomicBool>,
    _streams: Option<(Stream, Stream)>,
}

impl AudioStream {
    /// Resolve devices for `config`.
    pub fn new(config: StreamConfig) -> Result<Self> {
        let host = cpal::default_host();

        let input_device = match &config.input_device {
            Some(name) => find_device(
                host.input_devices().map_err(|e| Error::Stream(e.to_string()))?,
                name,
                "input",
            )?,
            None => host.default_input_device().ok_or(Error::NoDevice)?,
        };
        let output_device = match &config.output_device {
            Some(name) => find_device(
                host.output_devices().map_err(|e| Error::Stream(e.to_string()))?,
                name,
                "output",
            )?,
            None => host.default_output_device().ok_or(Error::NoDevice)?,
        };

        tracing::info!(
            input = %input_device.name().unwrap_or_default(),
            output = %output_device.name().unwrap_or_default(),
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "audio devices selected"
        );

        Ok(Self {
            host,
            input_device,
            output_device,
            config,
            running: Arc::new(AtomicBool::new(false)),
            _streams: None,
        })
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Configured buffer size in frames.
    pub fn buffer_size(&self) -> u32 {
        self.config.buffer_size
    }

    /// Handle for stopping the stream from elsewhere (e.g. a Ctrl+C handler).
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// Run with a stereo callback `(in_left, in_right, out_left, out_right)`
    /// until stopped. Blocks the calling thread.
    ///
    /// Output is silent whenever the input ring cannot supply a full block.
    pub fn run_stereo<F>(&mut self, mut process: F) -> Result<()>
    where
        F: FnMut(&[f32], &[f32], &mut [f32], &mut [f32]) + Send + 'static,
    {
        let input_channels = self
            .input_device
            .default_input_config()
            .map_err(|e| Error::Stream(e.to_string()))?
            .channels();
        let output_channels = self
            .output_device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?
            .channels();

        let stream_config = |channels| cpal::StreamConfig {
            channels,
            sample_rate: SampleRate(self.config.sample_rate),
            buffer_size: BufferSize::Fixed(self.config.buffer_size),
        };
        let in_ch = usize::from(input_channels);
        let out_ch = usize::from(output_channels);

        let block = (self.config.buffer_size as usize).max(MAX_CALLBACK_FRAMES);
        let (mut producer, mut consumer) = rtrb::RingBuffer::<f32>::new(block * in_ch * RING_BUFFERS);

        self.running.store(true, Ordering::SeqCst);

        let input_running = Arc::clone(&self.running);
        let input_stream = self
            .input_device
            .build_input_stream(
                &stream_config(input_channels),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !input_running.load(Ordering::Relaxed) {
                        return;
                    }
                    for &sample in data {
                        if producer.push(sample).is_err() {
                            break;
                        }
                    }
                },
                |err| tracing::error!(%err, "input stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        let output_running = Arc::clone(&self.running);
        let mut in_left = vec![0.0f32; MAX_CALLBACK_FRAMES];
        let mut in_right = vec![0.0f32; MAX_CALLBACK_FRAMES];
        let mut out_left = vec![0.0f32; MAX_CALLBACK_FRAMES];
        let mut out_right = vec![0.0f32; MAX_CALLBACK_FRAMES];

        let output_stream = self
            .output_device
            .build_output_stream(
                &stream_config(output_channels),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !output_running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for out in data.chunks_mut(out_ch * MAX_CALLBACK_FRAMES) {
                        let frames = out.len() / out_ch;
                        if consumer.slots() < frames * in_ch {
                            out.fill(0.0);
                            continue;
                        }
                        for i in 0..frames {
                            let (l, r) = pop_frame(&mut consumer, in_ch);
                            in_left[i] = l;
                            in_right[i] = r;
                        }
                        process(
                            &in_left[..frames],
                            &in_right[..frames],
                            &mut out_left[..frames],
                            &mut out_right[..frames],
                        );
                        interleave_into(&out_left[..frames], &out_right[..frames], out, out_ch);
                    }
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        input_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        self._streams = Some((input_stream, output_stream));
        tracing::info!(input_channels, output_channels, "audio stream running");

        while self.running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
        }

        self._streams = None;
        tracing::info!("audio stream stopped");
        Ok(())
    }

    /// Stop the stream.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// True while [`run_stereo`](Self::run_stereo) is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Pop one interleaved frame as (left, right). Mono input feeds both sides;
/// channels past the second are discarded.
fn pop_frame(consumer: &mut rtrb::Consumer<f32>, channels: usize) -> (f32, f32) {
    let left = consumer.pop().unwrap_or(0.0);
    let right = if channels > 1 {
        consumer.pop().unwrap_or(left)
    } else {
        left
    };
    for _ in 2..channels {
        let _ = consumer.pop();
    }
    (left, right)
}

/// Write `left`/`right` into an interleaved buffer of `channels` channels.
/// Mono outputs get the average; extra channels are silenced.
fn interleave_into(left: &[f32], right: &[f32], out: &mut [f32], channels: usize) {
    for ((frame, &l), &r) in out.chunks_exact_mut(channels).zip(left).zip(right) {
        match frame {
            [mono] => *mono = 0.5 * (l + r),
            [a, b, rest @ ..] => {
                *a = l;
                *b = r;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_stereo() {
        let mut out = [0.0; 6];
        interleave_into(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0], &mut out, 2);
        assert_eq!(out, [1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
    }

    #[test]
    fn interleave_mono_averages() {
        let mut out = [9.0; 2];
        interleave_into(&[1.0, 0.0], &[0.0, -1.0], &mut out, 1);
        assert_eq!(out, [0.5, -0.5]);
    }

    #[test]
    fn interleave_silences_extra_channels() {
        let mut out = [9.0; 4];
        interleave_into(&[0.25], &[0.75], &mut out, 4);
        assert_eq!(out, [0.25, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn pop_frame_handles_channel_counts() {
        let (mut tx, mut rx) = rtrb::RingBuffer::<f32>::new(16);
        for s in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6] {
            tx.push(s).unwrap();
        }
        assert_eq!(pop_frame(&mut rx, 1), (0.1, 0.1));
        assert_eq!(pop_frame(&mut rx, 2), (0.2, 0.3));
        assert_eq!(pop_frame(&mut rx, 3), (0.4, 0.5));
        assert_eq!(rx.slots(), 0);
    }

    #[test]
    fn stop_handle_clears_running_flag() {
        let running = Arc::new(AtomicBool::new(true));
        StopHandle(Arc::clone(&running)).stop();
        assert!(!running.load(Ordering::SeqCst));
    }
}
