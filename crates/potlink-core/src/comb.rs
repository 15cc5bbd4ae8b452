//! Lowpass-feedback comb filter, the resonant section of a Freeverb tank.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::flush_denormal;

/// Feedback comb with a one-pole lowpass in the loop.
///
/// Output is the input delayed by the buffer length; each trip around the
/// loop is scaled by `feedback` and darkened by `damp`.
///
/// ```rust
/// use potlink_core::CombFilter;
///
/// let mut comb = CombFilter::new(4);
/// comb.set_feedback(0.5);
/// comb.set_damp(0.0);
/// let out: Vec<f32> = [1.0, 0.0, 0.0, 0.0, 0.0].iter().map(|&x| comb.process(x)).collect();
/// assert_eq!(out[4], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl CombFilter {
    /// Comb with a delay of `delay_samples` (at least one).
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
            feedback: 0.5,
            damp: 0.5,
            store: 0.0,
        }
    }

    /// Loop gain, clamped to `[0, 1]`. At 1.0 with no damping the loop
    /// sustains indefinitely (reverb freeze).
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 1.0);
    }

    /// Current loop gain.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// High-frequency damping in `[0, 1]`; 0 is bright.
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Current damping.
    pub fn damp(&self) -> f32 {
        self.damp
    }

    /// One sample in, one out.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.pos];
        self.store = flush_denormal(out * (1.0 - self.damp) + self.store * self.damp);
        self.buffer[self.pos] = input + self.store * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }

    /// Zero the loop.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
        self.store = 0.0;
    }

    /// Delay length in samples.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always false; a comb holds at least one sample.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
