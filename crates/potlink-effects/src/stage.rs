//! Closed set of effect stages.
//!
//! The chain topology is fixed, so stages are an enum rather than boxed trait
//! objects: dispatch is a `match`, nothing is allocated per stage, and the
//! chain can hold its stages inline.

use core::fmt;

use potlink_core::{Effect, ParamDescriptor, ParameterInfo};

use crate::{Chorus, Compressor, Delay, Gain, Reverb};

/// Which processor a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Dynamics compressor.
    Compressor,
    /// Linear gain.
    Gain,
    /// Two-voice chorus.
    Chorus,
    /// Feedback delay.
    Delay,
    /// Freeverb-style reverb.
    Reverb,
}

impl StageKind {
    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Compressor => "compressor",
            Self::Gain => "gain",
            Self::Chorus => "chorus",
            Self::Delay => "delay",
            Self::Reverb => "reverb",
        }
    }

    /// Parameter table for this kind.
    pub const fn params(self) -> &'static [ParamDescriptor] {
        match self {
            Self::Compressor => &crate::compressor::PARAMS,
            Self::Gain => &crate::gain::PARAMS,
            Self::Chorus => &crate::chorus::PARAMS,
            Self::Delay => &crate::delay::PARAMS,
            Self::Reverb => &crate::reverb::PARAMS,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One processing stage.
#[derive(Debug, Clone)]
pub enum EffectStage {
    /// See [`Compressor`].
    Compressor(Compressor),
    /// See [`Gain`].
    Gain(Gain),
    /// See [`Chorus`].
    Chorus(Chorus),
    /// See [`Delay`].
    Delay(Delay),
    /// See [`Reverb`].
    Reverb(Reverb),
}

macro_rules! dispatch {
    ($stage:expr, $inner:ident => $body:expr) => {
        match $stage {
            EffectStage::Compressor($inner) => $body,
            EffectStage::Gain($inner) => $body,
            EffectStage::Chorus($inner) => $body,
            EffectStage::Delay($inner) => $body,
            EffectStage::Reverb($inner) => $body,
        }
    };
}

impl EffectStage {
    /// Stage of `kind` at its default settings.
    pub fn new(kind: StageKind, sample_rate: f32) -> Self {
        match kind {
            StageKind::Compressor => Self::Compressor(Compressor::new(sample_rate)),
            StageKind::Gain => Self::Gain(Gain::new(sample_rate)),
            StageKind::Chorus => Self::Chorus(Chorus::new(sample_rate)),
            StageKind::Delay => Self::Delay(Delay::new(sample_rate)),
            StageKind::Reverb => Self::Reverb(Reverb::new(sample_rate)),
        }
    }

    /// Kind of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Compressor(_) => StageKind::Compressor,
            Self::Gain(_) => StageKind::Gain,
            Self::Chorus(_) => StageKind::Chorus,
            Self::Delay(_) => StageKind::Delay,
            Self::Reverb(_) => StageKind::Reverb,
        }
    }

    /// Prepare for a new stream: adopt the sample rate, clear all state and
    /// snap parameters to their targets.
    ///
    /// May allocate (delay lines are resized for the rate). Call before
    /// processing, never from the audio callback.
    pub fn configure(&mut self, sample_rate: f32) {
        self.set_sample_rate(sample_rate);
        self.reset();
    }

    /// Set a parameter by name from a normalized `[0, 1]` value.
    ///
    /// Returns `false` if the stage has no parameter with that name.
    pub fn set_parameter(&mut self, name: &str, normalized: f32) -> bool {
        match self.find_param_by_name(name) {
            Some(index) => {
                self.set_normalized(index, normalized);
                true
            }
            None => false,
        }
    }

    /// Set parameter `index` from a normalized `[0, 1]` value.
    #[inline]
    pub fn set_normalized(&mut self, index: usize, normalized: f32) {
        if let Some(desc) = self.kind().params().get(index) {
            self.set_param(index, desc.denormalize(normalized));
        }
    }
}

impl Effect for EffectStage {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        dispatch!(self, s => s.process(input))
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        dispatch!(self, s => s.process_stereo(left, right))
    }

    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        dispatch!(self, s => s.process_block_inplace(buffer));
    }

    fn process_block_stereo_inplace(&mut self, left: &mut [f32], right: &mut [f32]) {
        dispatch!(self, s => s.process_block_stereo_inplace(left, right));
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        dispatch!(self, s => s.set_sample_rate(sample_rate));
    }

    fn reset(&mut self) {
        dispatch!(self, s => s.reset());
    }

    fn latency_samples(&self) -> usize {
        dispatch!(self, s => s.latency_samples())
    }
}

impl ParameterInfo for EffectStage {
    fn param_count(&self) -> usize {
        self.kind().params().len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        self.kind().params().get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        dispatch!(self, s => s.get_param(index))
    }

    fn set_param(&mut self, index: usize, value: f32) {
        dispatch!(self, s => s.set_param(index, value));
    }
}
