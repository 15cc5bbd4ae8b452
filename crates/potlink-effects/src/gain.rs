//! Linear gain stage, used for the pre-gain and master-gain positions.

use potlink_core::{Effect, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam};

/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | gain | 0–2 (linear) | 0.5 |
pub const PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::new("gain", ParamUnit::Gain, 0.0, 2.0, 0.5)];

/// Smoothed linear gain.
#[derive(Debug, Clone)]
pub struct Gain {
    gain: SmoothedParam,
}

impl Gain {
    /// Gain at the table default.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_gain(sample_rate, PARAMS[0].default)
    }

    /// Gain starting at `gain` (clamped to `[0, 2]`).
    pub fn with_gain(sample_rate: f32, gain: f32) -> Self {
        Self {
            gain: SmoothedParam::fast(PARAMS[0].clamp(gain), sample_rate),
        }
    }

    /// Glide to `gain`.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain.set_target(PARAMS[0].clamp(gain));
    }

    /// Gain being glided toward.
    pub fn gain(&self) -> f32 {
        self.gain.target()
    }
}

impl Effect for Gain {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        input * self.gain.advance()
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let g = self.gain.advance();
        (left * g, right * g)
    }

    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        if self.gain.is_settled() {
            let g = self.gain.get();
            buffer.iter_mut().for_each(|s| *s *= g);
        } else {
            buffer.iter_mut().for_each(|s| *s *= self.gain.advance());
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.gain.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
    }
}

impl ParameterInfo for Gain {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        if index == 0 { self.gain.target() } else { 0.0 }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.set_gain(value);
        }
    }
}
