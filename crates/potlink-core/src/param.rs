//! Parameter smoothing for zipper-free controller changes.
//!
//! A potentiometer read over a 7-bit link moves in steps of 1/127. Applied
//! directly, each step is an audible discontinuity. [`SmoothedParam`] turns a
//! step into a one-pole glide toward the new target.
//!
//! ```rust
//! use potlink_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::standard(1.0, 48000.0);
//! gain.set_target(0.5);
//!
//! // 10 ms time constant: after 480 samples we are ~63% of the way there
//! for _ in 0..480 {
//!     gain.advance();
//! }
//! assert!(gain.get() < 0.9 && gain.get() > 0.6);
//! ```

use libm::expf;

/// Time constant used by [`SmoothedParam::standard`], in milliseconds.
pub const STANDARD_SMOOTHING_MS: f32 = 10.0;

/// Time constant used by [`SmoothedParam::fast`], in milliseconds.
pub const FAST_SMOOTHING_MS: f32 = 5.0;

/// A parameter that glides exponentially toward its target.
///
/// `y[n] = y[n-1] + coeff * (target - y[n-1])` with
/// `coeff = 1 - exp(-1 / (tau * sample_rate))`.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a parameter that follows its target instantly.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a parameter with an explicit sample rate and time constant.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// 10 ms smoothing, the default for controller-driven parameters.
    pub fn standard(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, STANDARD_SMOOTHING_MS)
    }

    /// 5 ms smoothing, used for gains and bypass crossfades.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, FAST_SMOOTHING_MS)
    }

    /// Set the value to glide toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set the target and jump to it.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update the sample rate, keeping the time constant in milliseconds.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Change the time constant. Zero disables smoothing.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Advance by one sample and return the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value, without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Value being glided toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the value is within 1e-6 of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
