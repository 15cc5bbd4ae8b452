//! Fractional delay line for the chorus and echo stages.
//!
//! The chorus reads at an LFO-modulated position every sample and the echo
//! glides its time while a knob turns, so reads interpolate linearly between
//! neighbouring samples.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Circular-buffer delay line with linear interpolation.
///
/// The buffer is allocated once at construction. `read(0.0)` returns the
/// most recently written sample.
///
/// ```rust
/// use potlink_core::InterpolatedDelay;
///
/// let mut line = InterpolatedDelay::new(16);
/// line.write(1.0);
/// line.write(0.0);
/// assert_eq!(line.read(1.0), 1.0);
/// assert_eq!(line.read(0.5), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl InterpolatedDelay {
    /// Delay line holding `max_delay_samples` samples (at least one).
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1)],
            write_pos: 0,
        }
    }

    /// Delay line long enough for `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds) as usize + 2)
    }

    /// Sample written `delay_samples` writes ago, interpolated.
    ///
    /// Delays are clamped to `[0, capacity - 1]`.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(0.0, (len - 1) as f32);
        let whole = delay as usize;
        let frac = delay - whole as f32;

        let newer = (self.write_pos + len - whole - 1) % len;
        let older = (newer + len - 1) % len;
        let a = self.buffer[newer];
        a + (self.buffer[older] - a) * frac
    }

    /// Push one sample.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read at `delay_samples`, then write `sample`.
    #[inline]
    pub fn read_write(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let out = self.read(delay_samples);
        self.write(sample);
        out
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
