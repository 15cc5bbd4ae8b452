//! Feedback delay.
//!
//! Delay time glides over 50 ms so sweeping the time control pitches the
//! repeats instead of clicking.

use potlink_core::{
    Effect, InterpolatedDelay, ParamDescriptor, ParamScale, ParamUnit, ParameterInfo,
    SmoothedParam, flush_denormal, wet_dry_mix, wet_dry_mix_stereo,
};

const TIME_SMOOTHING_MS: f32 = 50.0;

/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | time | 1–2000 ms (log) | 250 |
/// | 1 | feedback | 0–0.95 | 0.3 |
/// | 2 | mix | 0–1 | 0.3 |
pub const PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::time_ms("time", 1.0, 2000.0, 250.0).with_scale(ParamScale::Logarithmic),
    ParamDescriptor::new("feedback", ParamUnit::Amount, 0.0, 0.95, 0.3),
    ParamDescriptor::amount("mix", 0.3),
];

fn line_for(sample_rate: f32) -> InterpolatedDelay {
    InterpolatedDelay::from_time(sample_rate, PARAMS[0].max / 1000.0)
}

/// Stereo feedback delay with independent left and right lines.
///
/// ```rust
/// use potlink_core::Effect;
/// use potlink_effects::Delay;
///
/// let mut delay = Delay::new(48000.0);
/// delay.set_time_ms(10.0);
/// delay.set_mix(1.0);
/// delay.reset();
/// let out: Vec<f32> = (0..600).map(|i| delay.process(if i == 0 { 1.0 } else { 0.0 })).collect();
/// assert!(out[480] > 0.9);
/// ```
#[derive(Debug, Clone)]
pub struct Delay {
    left: InterpolatedDelay,
    right: InterpolatedDelay,
    time_ms: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    sample_rate: f32,
}

impl Delay {
    /// Delay with the table defaults.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            left: line_for(sample_rate),
            right: line_for(sample_rate),
            time_ms: SmoothedParam::with_config(PARAMS[0].default, sample_rate, TIME_SMOOTHING_MS),
            feedback: SmoothedParam::standard(PARAMS[1].default, sample_rate),
            mix: SmoothedParam::standard(PARAMS[2].default, sample_rate),
            sample_rate,
        }
    }

    /// Delay time in milliseconds.
    pub fn set_time_ms(&mut self, ms: f32) {
        self.time_ms.set_target(PARAMS[0].clamp(ms));
    }

    /// Feedback, 0–0.95.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(PARAMS[1].clamp(feedback));
    }

    /// Wet/dry mix.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(PARAMS[2].clamp(mix));
    }

    #[inline]
    fn advance(&mut self) -> (f32, f32, f32) {
        // read(0) is the newest sample, so one period is `samples - 1` back
        let samples = (self.time_ms.advance() * self.sample_rate / 1000.0 - 1.0).max(0.0);
        (samples, self.feedback.advance(), self.mix.advance())
    }
}

impl Effect for Delay {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (samples, feedback, mix) = self.advance();
        let wet = self.left.read(samples);
        self.left.write(flush_denormal(input + wet * feedback));
        wet_dry_mix(input, wet, mix)
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (samples, feedback, mix) = self.advance();
        let wet_l = self.left.read(samples);
        let wet_r = self.right.read(samples);
        self.left.write(flush_denormal(left + wet_l * feedback));
        self.right.write(flush_denormal(right + wet_r * feedback));
        wet_dry_mix_stereo(left, right, wet_l, wet_r, mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.left = line_for(sample_rate);
            self.right = line_for(sample_rate);
        }
        self.sample_rate = sample_rate;
        self.time_ms.set_sample_rate(sample_rate);
        self.feedback.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.time_ms.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
    }
}

impl ParameterInfo for Delay {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.time_ms.target(),
            1 => self.feedback.target(),
            2 => self.mix.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_time_ms(value),
            1 => self.set_feedback(value),
            2 => self.set_mix(value),
            _ => {}
        }
    }
}
