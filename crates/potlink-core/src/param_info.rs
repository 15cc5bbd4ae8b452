//! Parameter introspection.
//!
//! Routing a controller to a stage parameter is done by name at chain
//! construction time and by index on the audio thread. [`ParameterInfo`]
//! provides both views, and [`ParamDescriptor`] converts between the
//! normalized `[0, 1]` controller domain and a parameter's plain units.
//!
//! ```rust
//! use potlink_core::{ParamDescriptor, ParamScale, ParamUnit};
//!
//! let time = ParamDescriptor::time_ms("time", 1.0, 2000.0, 250.0)
//!     .with_scale(ParamScale::Logarithmic);
//!
//! assert!((time.denormalize(0.0) - 1.0).abs() < 1e-4);
//! assert!((time.denormalize(1.0) - 2000.0).abs() < 0.1);
//! assert_eq!(time.unit, ParamUnit::Milliseconds);
//! ```

/// Curve used to map between plain and normalized values.
///
/// - **Linear**: `normalized = (value - min) / (max - min)`
/// - **Logarithmic**: `normalized = ln(value / min) / ln(max / min)`, requires `min > 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution at the low end. For times and rates.
    Logarithmic,
}

/// Unit of a parameter's plain value, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamUnit {
    /// Decibels.
    Decibels,
    /// Hertz.
    Hertz,
    /// Milliseconds.
    Milliseconds,
    /// Compression ratio (`n:1`).
    Ratio,
    /// Linear gain multiplier.
    Gain,
    /// Dimensionless `[0, 1]` amount.
    Amount,
    /// On/off switch; engaged at 0.5 and above.
    Switch,
}

impl ParamUnit {
    /// Short suffix for printing a value in this unit.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Decibels => "dB",
            Self::Hertz => "Hz",
            Self::Milliseconds => "ms",
            Self::Ratio => ":1",
            Self::Gain => "x",
            Self::Amount | Self::Switch => "",
        }
    }
}

/// Metadata for one stage parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Routing name, lowercase snake case (`"attack"`, `"room_size"`).
    pub name: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Lowest plain value.
    pub min: f32,
    /// Highest plain value.
    pub max: f32,
    /// Plain value at construction.
    pub default: f32,
    /// Normalization curve.
    pub scale: ParamScale,
}

impl ParamDescriptor {
    /// Linear descriptor with an explicit unit.
    pub const fn new(name: &'static str, unit: ParamUnit, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            default,
            scale: ParamScale::Linear,
        }
    }

    /// Time in milliseconds.
    pub const fn time_ms(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self::new(name, ParamUnit::Milliseconds, min, max, default)
    }

    /// Level in decibels.
    pub const fn gain_db(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self::new(name, ParamUnit::Decibels, min, max, default)
    }

    /// Modulation rate in hertz, logarithmic.
    pub const fn rate_hz(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self::new(name, ParamUnit::Hertz, min, max, default).with_scale(ParamScale::Logarithmic)
    }

    /// `[0, 1]` amount (mix, depth, damping).
    pub const fn amount(name: &'static str, default: f32) -> Self {
        Self::new(name, ParamUnit::Amount, 0.0, 1.0, default)
    }

    /// On/off switch stored as 0.0 or 1.0.
    pub const fn switch(name: &'static str, default: bool) -> Self {
        Self::new(name, ParamUnit::Switch, 0.0, 1.0, if default { 1.0 } else { 0.0 })
    }

    /// Replace the normalization curve.
    pub const fn with_scale(mut self, scale: ParamScale) -> Self {
        self.scale = scale;
        self
    }

    /// Clamp a plain value into `[min, max]`.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Plain value to `[0, 1]`.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        let value = self.clamp(value);
        match self.scale {
            ParamScale::Linear => (value - self.min) / range,
            ParamScale::Logarithmic => {
                if self.min <= 0.0 {
                    return (value - self.min) / range;
                }
                libm::logf(value / self.min) / libm::logf(self.max / self.min)
            }
        }
    }

    /// `[0, 1]` to plain value. Inputs outside `[0, 1]` are clamped first.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let n = normalized.clamp(0.0, 1.0);
        let plain = match self.scale {
            ParamScale::Linear => self.min + n * (self.max - self.min),
            ParamScale::Logarithmic if self.min > 0.0 => {
                self.min * libm::powf(self.max / self.min, n)
            }
            ParamScale::Logarithmic => self.min + n * (self.max - self.min),
        };
        self.clamp(plain)
    }
}

/// Index-based parameter access for a stage.
///
/// Indices are stable for the life of the stage. `set_param` takes a plain
/// value and clamps it to the descriptor's range; out-of-range indices are
/// ignored.
pub trait ParameterInfo {
    /// Number of parameters; valid indices are `0..param_count()`.
    fn param_count(&self) -> usize;

    /// Descriptor for `index`, or `None` past the end.
    fn param_info(&self, index: usize) -> Option<ParamDescriptor>;

    /// Current plain value (the smoothing target) for `index`; `0.0` past the end.
    fn get_param(&self, index: usize) -> f32;

    /// Set the plain value for `index`.
    fn set_param(&mut self, index: usize, value: f32);

    /// Index of the parameter named `name`, compared case-insensitively.
    fn find_param_by_name(&self, name: &str) -> Option<usize> {
        (0..self.param_count()).find(|&i| {
            self.param_info(i)
                .is_some_and(|desc| desc.name.eq_ignore_ascii_case(name))
        })
    }
}
