//! Two-voice modulated-delay chorus.
//!
//! Each voice reads a delay line whose length swings around the centre delay
//! under its own sine LFO; the second LFO runs a quarter cycle behind the
//! first. Voice 1 leans left and voice 2 leans right, which widens the
//! stereo output. The averaged voices are fed back into the line.

use potlink_core::{
    Effect, InterpolatedDelay, Lfo, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam,
    flush_denormal, wet_dry_mix, wet_dry_mix_stereo,
};

/// Peak modulation swing at depth 1.0, in milliseconds.
const MOD_DEPTH_MS: f32 = 5.0;

/// Shortest delay a voice may read, in samples.
const MIN_DELAY_SAMPLES: f32 = 1.0;

/// Phase offset of the second voice, in turns.
const VOICE_PHASE_OFFSET: f32 = 0.25;

/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | rate | 0.1–20 Hz (log) | 20 |
/// | 1 | depth | 0–1 | 0.5 |
/// | 2 | centre_delay | 1–30 ms | 10 |
/// | 3 | feedback | 0–0.95 | 0 |
/// | 4 | mix | 0–1 | 0.5 |
pub const PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::rate_hz("rate", 0.1, 20.0, 20.0),
    ParamDescriptor::amount("depth", 0.5),
    ParamDescriptor::time_ms("centre_delay", 1.0, 30.0, 10.0),
    ParamDescriptor::new("feedback", ParamUnit::Amount, 0.0, 0.95, 0.0),
    ParamDescriptor::amount("mix", 0.5),
];

fn line_for(sample_rate: f32) -> InterpolatedDelay {
    InterpolatedDelay::from_time(sample_rate, (PARAMS[2].max + MOD_DEPTH_MS) / 1000.0)
}

/// Stereo chorus.
#[derive(Debug, Clone)]
pub struct Chorus {
    line: InterpolatedDelay,
    lfo1: Lfo,
    lfo2: Lfo,
    rate: SmoothedParam,
    depth: SmoothedParam,
    centre_ms: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    sample_rate: f32,
}

impl Chorus {
    /// Chorus with the table defaults.
    pub fn new(sample_rate: f32) -> Self {
        let rate = PARAMS[0].default;
        let lfo1 = Lfo::new(sample_rate, rate);
        let mut lfo2 = Lfo::new(sample_rate, rate);
        lfo2.set_phase(VOICE_PHASE_OFFSET);
        Self {
            line: line_for(sample_rate),
            lfo1,
            lfo2,
            rate: SmoothedParam::standard(rate, sample_rate),
            depth: SmoothedParam::standard(PARAMS[1].default, sample_rate),
            centre_ms: SmoothedParam::standard(PARAMS[2].default, sample_rate),
            feedback: SmoothedParam::standard(PARAMS[3].default, sample_rate),
            mix: SmoothedParam::standard(PARAMS[4].default, sample_rate),
            sample_rate,
        }
    }

    /// LFO rate in Hz.
    pub fn set_rate_hz(&mut self, hz: f32) {
        self.rate.set_target(PARAMS[0].clamp(hz));
    }

    /// Modulation depth, 0–1.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth.set_target(PARAMS[1].clamp(depth));
    }

    /// Centre delay in milliseconds.
    pub fn set_centre_delay_ms(&mut self, ms: f32) {
        self.centre_ms.set_target(PARAMS[2].clamp(ms));
    }

    /// Feedback, 0–0.95.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(PARAMS[3].clamp(feedback));
    }

    /// Wet/dry mix.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(PARAMS[4].clamp(mix));
    }

    /// Advance the shared parameters and both LFOs; return the two voice
    /// outputs plus feedback and mix. Writing the line is left to the
    /// caller so mono and stereo paths share the read side.
    #[inline]
    fn voices(&mut self) -> (f32, f32, f32, f32) {
        if !self.rate.is_settled() {
            let rate = self.rate.advance();
            self.lfo1.set_frequency(rate);
            self.lfo2.set_frequency(rate);
        }
        let depth = self.depth.advance();
        let centre = self.centre_ms.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let ms_to_samples = self.sample_rate / 1000.0;
        let swing = depth * MOD_DEPTH_MS;
        let d1 = ((centre + swing * self.lfo1.advance()) * ms_to_samples).max(MIN_DELAY_SAMPLES);
        let d2 = ((centre + swing * self.lfo2.advance()) * ms_to_samples).max(MIN_DELAY_SAMPLES);

        (self.line.read(d1), self.line.read(d2), feedback, mix)
    }
}

impl Effect for Chorus {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (v1, v2, feedback, mix) = self.voices();
        let wet = (v1 + v2) * 0.5;
        self.line.write(flush_denormal(input + wet * feedback));
        wet_dry_mix(input, wet, mix)
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (v1, v2, feedback, mix) = self.voices();
        let mid = (left + right) * 0.5;
        let wet = (v1 + v2) * 0.5;
        self.line.write(flush_denormal(mid + wet * feedback));

        let wet_l = v1 * 0.8 + v2 * 0.2;
        let wet_r = v1 * 0.2 + v2 * 0.8;
        wet_dry_mix_stereo(left, right, wet_l, wet_r, mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.line = line_for(sample_rate);
        }
        self.sample_rate = sample_rate;
        self.lfo1.set_sample_rate(sample_rate);
        self.lfo2.set_sample_rate(sample_rate);
        self.rate.set_sample_rate(sample_rate);
        self.depth.set_sample_rate(sample_rate);
        self.centre_ms.set_sample_rate(sample_rate);
        self.feedback.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.line.clear();
        self.rate.snap_to_target();
        self.depth.snap_to_target();
        self.centre_ms.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
        self.lfo1.set_frequency(self.rate.get());
        self.lfo2.set_frequency(self.rate.get());
        self.lfo1.reset();
        self.lfo2.set_phase(VOICE_PHASE_OFFSET);
    }
}

impl ParameterInfo for Chorus {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.rate.target(),
            1 => self.depth.target(),
            2 => self.centre_ms.target(),
            3 => self.feedback.target(),
            4 => self.mix.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_rate_hz(value),
            1 => self.set_depth(value),
            2 => self.set_centre_delay_ms(value),
            3 => self.set_feedback(value),
            4 => self.set_mix(value),
            _ => {}
        }
    }
}
