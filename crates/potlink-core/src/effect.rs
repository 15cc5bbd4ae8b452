//! The stage contract.
//!
//! Every effect stage in the chain implements [`Effect`]. The chain drives
//! stages block by block, so the block methods are the hot path; the
//! per-sample methods exist so stages can be composed and tested one sample
//! at a time.
//!
//! Stereo is part of the contract rather than an afterthought: the reverb has
//! true stereo width and the chain runs duplex stereo streams, so
//! [`Effect::process_stereo`] has no default and each stage states its own
//! stereo behavior.

/// Core trait for all effect stages.
///
/// Implementations must not allocate, lock or block in any `process*`
/// method. Allocation belongs in constructors and [`set_sample_rate`](Self::set_sample_rate).
///
/// # Example
///
/// ```rust
/// use potlink_core::Effect;
///
/// struct Trim(f32);
///
/// impl Effect for Trim {
///     fn process(&mut self, input: f32) -> f32 {
///         input * self.0
///     }
///
///     fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
///         (left * self.0, right * self.0)
///     }
///
///     fn set_sample_rate(&mut self, _sample_rate: f32) {}
///
///     fn reset(&mut self) {}
/// }
///
/// let mut trim = Trim(0.5);
/// let mut block = [1.0, -1.0];
/// trim.process_block_inplace(&mut block);
/// assert_eq!(block, [0.5, -0.5]);
/// ```
pub trait Effect {
    /// Process one mono sample.
    fn process(&mut self, input: f32) -> f32;

    /// Process one stereo frame.
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32);

    /// Process a mono block in place.
    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Process a stereo block in place.
    ///
    /// Both channels must have the same length; the shorter one bounds the
    /// number of frames processed.
    fn process_block_stereo_inplace(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "channel lengths differ");
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (out_l, out_r) = self.process_stereo(*l, *r);
            *l = out_l;
            *r = out_r;
        }
    }

    /// Update the sample rate and recompute rate-dependent coefficients.
    ///
    /// Delay-based stages reallocate their lines here, so this is never
    /// called from the audio callback.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state (delay lines, envelopes, filter memory) without
    /// touching parameters.
    fn reset(&mut self);

    /// Processing latency in samples. Zero for every stage in this workspace.
    fn latency_samples(&self) -> usize {
        0
    }
}
