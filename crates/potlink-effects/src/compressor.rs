//! Feed-forward compressor with a soft knee.
//!
//! # Signal Flow
//!
//! ```text
//! Input → Envelope Follower → Gain Computer → Gain Reduction → Makeup → Output
//! ```
//!
//! Stereo detection is linked: the envelope follows the mid signal and both
//! channels get the same gain, so the image does not shift.

use potlink_core::{
    Effect, EnvelopeFollower, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam,
    db_to_linear, linear_to_db,
};

/// Knee width in dB. Fixed; not exposed to controllers.
const KNEE_DB: f32 = 6.0;

/// Parameter table, in index order.
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | threshold | -60–0 dB | 0 |
/// | 1 | ratio | 1–20 | 3 |
/// | 2 | attack | 0.1–100 ms | 40 |
/// | 3 | release | 10–1000 ms | 20 |
/// | 4 | makeup | 0–24 dB | 0 |
pub const PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::gain_db("threshold", -60.0, 0.0, 0.0),
    ParamDescriptor::new("ratio", ParamUnit::Ratio, 1.0, 20.0, 3.0),
    ParamDescriptor::time_ms("attack", 0.1, 100.0, 40.0),
    ParamDescriptor::time_ms("release", 10.0, 1000.0, 20.0),
    ParamDescriptor::gain_db("makeup", 0.0, 24.0, 0.0),
];

/// Static gain curve: gain change in dB (always <= 0) for a detector level.
#[inline]
fn gain_reduction_db(level_db: f32, threshold_db: f32, ratio: f32) -> f32 {
    let overshoot = level_db - threshold_db;
    let slope = 1.0 - 1.0 / ratio;
    if overshoot <= -KNEE_DB / 2.0 {
        0.0
    } else if overshoot > KNEE_DB / 2.0 {
        -overshoot * slope
    } else {
        let x = (overshoot + KNEE_DB / 2.0) / KNEE_DB;
        -x * x * overshoot * slope
    }
}

/// Dynamics compressor stage.
///
/// ```rust
/// use potlink_core::Effect;
/// use potlink_effects::Compressor;
///
/// let mut comp = Compressor::new(48000.0);
/// comp.set_threshold_db(-24.0);
/// comp.set_ratio(8.0);
/// for _ in 0..4800 {
///     comp.process(0.9);
/// }
/// assert!(comp.gain_reduction_db() < -10.0);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    envelope: EnvelopeFollower,
    threshold_db: SmoothedParam,
    ratio: SmoothedParam,
    attack_ms: SmoothedParam,
    release_ms: SmoothedParam,
    makeup_db: SmoothedParam,
    last_reduction_db: f32,
}

impl Compressor {
    /// Compressor with the table defaults.
    pub fn new(sample_rate: f32) -> Self {
        let attack = PARAMS[2].default;
        let release = PARAMS[3].default;
        Self {
            envelope: EnvelopeFollower::with_times(sample_rate, attack, release),
            threshold_db: SmoothedParam::standard(PARAMS[0].default, sample_rate),
            ratio: SmoothedParam::standard(PARAMS[1].default, sample_rate),
            attack_ms: SmoothedParam::standard(attack, sample_rate),
            release_ms: SmoothedParam::standard(release, sample_rate),
            makeup_db: SmoothedParam::fast(PARAMS[4].default, sample_rate),
            last_reduction_db: 0.0,
        }
    }

    /// Threshold in dB.
    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold_db.set_target(PARAMS[0].clamp(db));
    }

    /// Ratio (`n:1`).
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio.set_target(PARAMS[1].clamp(ratio));
    }

    /// Attack in milliseconds.
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms.set_target(PARAMS[2].clamp(ms));
    }

    /// Release in milliseconds.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms.set_target(PARAMS[3].clamp(ms));
    }

    /// Makeup gain in dB.
    pub fn set_makeup_db(&mut self, db: f32) {
        self.makeup_db.set_target(PARAMS[4].clamp(db));
    }

    /// Gain change applied to the last sample, in dB (0 = no compression).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_reduction_db
    }

    /// Advance every smoothed parameter one sample and return the linear gain
    /// for a detector input of `detect`.
    #[inline]
    fn gain_for(&mut self, detect: f32) -> f32 {
        let threshold = self.threshold_db.advance();
        let ratio = self.ratio.advance();
        let makeup = self.makeup_db.advance();

        // Envelope coefficients cost two expf; only recompute while gliding.
        if !self.attack_ms.is_settled() {
            let attack = self.attack_ms.advance();
            self.envelope.set_attack_ms(attack);
        }
        if !self.release_ms.is_settled() {
            let release = self.release_ms.advance();
            self.envelope.set_release_ms(release);
        }

        let level_db = linear_to_db(self.envelope.process(detect));
        let reduction = gain_reduction_db(level_db, threshold, ratio);
        self.last_reduction_db = reduction;
        db_to_linear(reduction + makeup)
    }

    fn snap(&mut self) {
        self.threshold_db.snap_to_target();
        self.ratio.snap_to_target();
        self.attack_ms.snap_to_target();
        self.release_ms.snap_to_target();
        self.makeup_db.snap_to_target();
        self.envelope.set_attack_ms(self.attack_ms.get());
        self.envelope.set_release_ms(self.release_ms.get());
    }
}

impl Effect for Compressor {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        input * self.gain_for(input)
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let gain = self.gain_for((left + right) * 0.5);
        (left * gain, right * gain)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.envelope.set_sample_rate(sample_rate);
        self.threshold_db.set_sample_rate(sample_rate);
        self.ratio.set_sample_rate(sample_rate);
        self.attack_ms.set_sample_rate(sample_rate);
        self.release_ms.set_sample_rate(sample_rate);
        self.makeup_db.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.last_reduction_db = 0.0;
        self.snap();
    }
}

impl ParameterInfo for Compressor {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.threshold_db.target(),
            1 => self.ratio.target(),
            2 => self.attack_ms.target(),
            3 => self.release_ms.target(),
            4 => self.makeup_db.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_threshold_db(value),
            1 => self.set_ratio(value),
            2 => self.set_attack_ms(value),
            3 => self.set_release_ms(value),
            4 => self.set_makeup_db(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_below_knee_is_unity() {
        assert_eq!(gain_reduction_db(-40.0, -20.0, 4.0), 0.0);
    }

    #[test]
    fn curve_above_knee_follows_ratio() {
        // 12 dB over at 4:1 leaves 3 dB, a 9 dB reduction
        assert!((gain_reduction_db(-8.0, -20.0, 4.0) + 9.0).abs() < 1e-4);
    }

    #[test]
    fn curve_is_continuous_at_knee_edges() {
        let edge = KNEE_DB / 2.0;
        let inside = gain_reduction_db(-20.0 + edge - 1e-3, -20.0, 4.0);
        let outside = gain_reduction_db(-20.0 + edge + 1e-3, -20.0, 4.0);
        assert!((inside - outside).abs() < 0.01);
    }

    #[test]
    fn ratio_one_never_compresses() {
        assert_eq!(gain_reduction_db(0.0, -60.0, 1.0), 0.0);
    }

    #[test]
    fn quiet_signal_passes_at_default_threshold() {
        let mut comp = Compressor::new(48000.0);
        let mut out = 0.0;
        for _ in 0..4800 {
            out = comp.process(0.1);
        }
        assert!((out - 0.1).abs() < 1e-3, "got {out}");
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new(48000.0);
        comp.set_threshold_db(-30.0);
        comp.set_ratio(10.0);
        comp.reset();
        let mut out = 0.0;
        for _ in 0..9600 {
            out = comp.process(0.8);
        }
        assert!(out < 0.2, "got {out}");
    }

    #[test]
    fn makeup_raises_level() {
        let mut comp = Compressor::new(48000.0);
        comp.set_makeup_db(6.0);
        comp.reset();
        let out = comp.process(0.01);
        assert!((out - 0.01 * db_to_linear(6.0)).abs() < 1e-4);
    }

    #[test]
    fn stereo_gain_is_linked() {
        let mut comp = Compressor::new(48000.0);
        comp.set_threshold_db(-30.0);
        comp.reset();
        for _ in 0..2000 {
            let (l, r) = comp.process_stereo(0.8, 0.4);
            assert!((l / 0.8 - r / 0.4).abs() < 1e-5);
        }
    }

    #[test]
    fn attack_glides_into_envelope() {
        let mut comp = Compressor::new(48000.0);
        comp.set_attack_ms(1.0);
        for _ in 0..4800 {
            comp.process(0.0);
        }
        assert!((comp.envelope.attack_ms() - 1.0).abs() < 0.01);
    }

    #[test]
    fn params_clamp_to_table() {
        let mut comp = Compressor::new(48000.0);
        comp.set_param(1, 100.0);
        assert_eq!(comp.get_param(1), 20.0);
        comp.set_param(2, 0.0);
        assert_eq!(comp.get_param(2), 0.1);
        assert_eq!(comp.find_param_by_name("makeup"), Some(4));
    }
}
