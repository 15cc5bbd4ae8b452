//! Schroeder allpass for reverb diffusion.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::flush_denormal;

/// Allpass diffuser: flat magnitude response, smeared phase.
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    /// Allpass with a delay of `delay_samples` (at least one).
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
            feedback: 0.5,
        }
    }

    /// Feedback coefficient, clamped to `(-1, 1)`.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-0.99, 0.99);
    }

    /// Current feedback.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// One sample in, one out.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = flush_denormal(input + delayed * self.feedback);
        self.pos = (self.pos + 1) % self.buffer.len();
        delayed - input
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_output_is_negated_input() {
        let mut ap = AllpassFilter::new(10);
        assert_eq!(ap.process(1.0), -1.0);
    }

    #[test]
    fn delayed_impulse_appears() {
        let mut ap = AllpassFilter::new(10);
        ap.process(1.0);
        for _ in 0..9 {
            ap.process(0.0);
        }
        assert!(ap.process(0.0) > 0.9);
    }

    #[test]
    fn echoes_scale_by_feedback() {
        let mut ap = AllpassFilter::new(50);
        ap.set_feedback(0.5);
        let out: Vec<f32> = (0..101)
            .map(|i| ap.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();
        assert_eq!(out[50], 1.0);
        assert_eq!(out[100], 0.5);
    }

    #[test]
    fn decays_without_subnormals() {
        let mut ap = AllpassFilter::new(100);
        ap.set_feedback(0.7);
        for _ in 0..1000 {
            ap.process(0.5);
        }
        for i in 0..100_000 {
            let out = ap.process(0.0);
            assert!(
                out == 0.0 || out.abs() > f32::MIN_POSITIVE,
                "subnormal at {i}: {out:e}"
            );
        }
    }
}
