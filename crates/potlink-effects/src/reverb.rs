//! Freeverb-style stereo reverb.
//!
//! ## Architecture
//!
//! ```text
//! L+R ──→ ×input gain ──┬─→ [8 parallel combs L] → [4 series allpasses L] ─→ wet L
//!                       └─→ [8 parallel combs R] → [4 series allpasses R] ─→ wet R
//!
//! out L = wet L × wet1 + wet R × wet2 + in L × dry
//! out R = wet R × wet1 + wet L × wet2 + in R × dry
//! ```
//!
//! The right tank is the left one with every line 23 samples longer, which
//! decorrelates the channels. `width` cross-mixes the two tanks: 1.0 keeps
//! them apart, 0.0 collapses to mono.
//!
//! ## Freeze
//!
//! With `freeze` engaged the combs run at unity feedback with no damping and
//! the input is muted, so the current tail sustains indefinitely. Engaging
//! and releasing glide over the standard smoothing time.

use potlink_core::{
    AllpassFilter, CombFilter, Effect, ParamDescriptor, ParameterInfo, SmoothedParam,
};

const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_RATE: f32 = 44100.0;

const FIXED_GAIN: f32 = 0.015;
const SCALE_WET: f32 = 3.0;
const SCALE_DRY: f32 = 2.0;
const SCALE_DAMP: f32 = 0.4;
const SCALE_ROOM: f32 = 0.28;
const OFFSET_ROOM: f32 = 0.7;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | room_size | 0–1 | 1.0 |
/// | 1 | damping | 0–1 | 0.5 |
/// | 2 | wet_level | 0–1 | 0.33 |
/// | 3 | dry_level | 0–1 | 0.4 |
/// | 4 | width | 0–1 | 1.0 |
/// | 5 | freeze | off/on (≥ 0.5 engages) | off |
pub const PARAMS: [ParamDescriptor; 6] = [
    ParamDescriptor::amount("room_size", 1.0),
    ParamDescriptor::amount("damping", 0.5),
    ParamDescriptor::amount("wet_level", 0.33),
    ParamDescriptor::amount("dry_level", 0.4),
    ParamDescriptor::amount("width", 1.0),
    ParamDescriptor::switch("freeze", false),
];

fn scaled(samples: usize, sample_rate: f32) -> usize {
    ((samples as f32 * sample_rate / TUNING_RATE) as usize).max(1)
}

/// One channel's comb bank and allpass chain.
#[derive(Debug, Clone)]
struct Tank {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl Tank {
    fn new(sample_rate: f32, spread: usize) -> Self {
        let combs = COMB_TUNING.map(|n| CombFilter::new(scaled(n + spread, sample_rate)));
        let allpasses = ALLPASS_TUNING.map(|n| {
            let mut ap = AllpassFilter::new(scaled(n + spread, sample_rate));
            ap.set_feedback(ALLPASS_FEEDBACK);
            ap
        });
        Self { combs, allpasses }
    }

    fn set_loop(&mut self, feedback: f32, damp: f32) {
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
            comb.set_damp(damp);
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input);
        }
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

/// Stereo reverb.
#[derive(Debug, Clone)]
pub struct Reverb {
    left: Tank,
    right: Tank,
    room_size: SmoothedParam,
    damping: SmoothedParam,
    wet_level: SmoothedParam,
    dry_level: SmoothedParam,
    width: SmoothedParam,
    /// 0.0 = running, 1.0 = frozen; glides between the two.
    freeze: SmoothedParam,
    /// Last `(feedback, damp)` pushed into the combs.
    loop_state: (f32, f32),
    sample_rate: f32,
}

impl Reverb {
    /// Reverb with the table defaults.
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            left: Tank::new(sample_rate, 0),
            right: Tank::new(sample_rate, STEREO_SPREAD),
            room_size: SmoothedParam::standard(PARAMS[0].default, sample_rate),
            damping: SmoothedParam::standard(PARAMS[1].default, sample_rate),
            wet_level: SmoothedParam::standard(PARAMS[2].default, sample_rate),
            dry_level: SmoothedParam::standard(PARAMS[3].default, sample_rate),
            width: SmoothedParam::standard(PARAMS[4].default, sample_rate),
            freeze: SmoothedParam::standard(PARAMS[5].default, sample_rate),
            loop_state: (f32::NAN, f32::NAN),
            sample_rate,
        };
        reverb.sync_loop();
        reverb
    }

    /// Room size, 0–1.
    pub fn set_room_size(&mut self, size: f32) {
        self.room_size.set_target(PARAMS[0].clamp(size));
    }

    /// High-frequency damping, 0–1.
    pub fn set_damping(&mut self, damping: f32) {
        self.damping.set_target(PARAMS[1].clamp(damping));
    }

    /// Wet level, 0–1.
    pub fn set_wet_level(&mut self, level: f32) {
        self.wet_level.set_target(PARAMS[2].clamp(level));
    }

    /// Dry level, 0–1.
    pub fn set_dry_level(&mut self, level: f32) {
        self.dry_level.set_target(PARAMS[3].clamp(level));
    }

    /// Stereo width, 0–1.
    pub fn set_width(&mut self, width: f32) {
        self.width.set_target(PARAMS[4].clamp(width));
    }

    /// Engage or release freeze.
    pub fn set_freeze(&mut self, frozen: bool) {
        self.freeze.set_target(if frozen { 1.0 } else { 0.0 });
    }

    /// True if freeze is engaged (or engaging).
    pub fn is_frozen(&self) -> bool {
        self.freeze.target() >= 0.5
    }

    /// Comb feedback and damping for the current smoothed values.
    fn loop_coefficients(&self) -> (f32, f32) {
        let f = self.freeze.get();
        let feedback = self.room_size.get() * SCALE_ROOM + OFFSET_ROOM;
        let damp = self.damping.get() * SCALE_DAMP;
        (feedback + (1.0 - feedback) * f, damp * (1.0 - f))
    }

    fn sync_loop(&mut self) {
        let state = self.loop_coefficients();
        if state != self.loop_state {
            self.left.set_loop(state.0, state.1);
            self.right.set_loop(state.0, state.1);
            self.loop_state = state;
        }
    }
}

impl Effect for Reverb {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (l, r) = self.process_stereo(input, input);
        (l + r) * 0.5
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let needs_sync = !(self.room_size.is_settled()
            && self.damping.is_settled()
            && self.freeze.is_settled());
        self.room_size.advance();
        self.damping.advance();
        let frozen = self.freeze.advance();
        if needs_sync {
            self.sync_loop();
        }

        let wet = self.wet_level.advance() * SCALE_WET;
        let dry = self.dry_level.advance() * SCALE_DRY;
        let width = self.width.advance();
        let wet1 = 0.5 * wet * (1.0 + width);
        let wet2 = 0.5 * wet * (1.0 - width);

        let input = (left + right) * FIXED_GAIN * (1.0 - frozen);
        let out_l = self.left.process(input);
        let out_r = self.right.process(input);

        (
            out_l * wet1 + out_r * wet2 + left * dry,
            out_r * wet1 + out_l * wet2 + right * dry,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.left = Tank::new(sample_rate, 0);
            self.right = Tank::new(sample_rate, STEREO_SPREAD);
            self.loop_state = (f32::NAN, f32::NAN);
        }
        self.sample_rate = sample_rate;
        self.room_size.set_sample_rate(sample_rate);
        self.damping.set_sample_rate(sample_rate);
        self.wet_level.set_sample_rate(sample_rate);
        self.dry_level.set_sample_rate(sample_rate);
        self.width.set_sample_rate(sample_rate);
        self.freeze.set_sample_rate(sample_rate);
        self.sync_loop();
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.room_size.snap_to_target();
        self.damping.snap_to_target();
        self.wet_level.snap_to_target();
        self.dry_level.snap_to_target();
        self.width.snap_to_target();
        self.freeze.snap_to_target();
        self.sync_loop();
    }
}

impl ParameterInfo for Reverb {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.room_size.target(),
            1 => self.damping.target(),
            2 => self.wet_level.target(),
            3 => self.dry_level.target(),
            4 => self.width.target(),
            5 => self.freeze.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_room_size(value),
            1 => self.set_damping(value),
            2 => self.set_wet_level(value),
            3 => self.set_dry_level(value),
            4 => self.set_width(value),
            5 => self.set_freeze(value >= 0.5),
            _ => {}
        }
    }
}
