//! potlink core - DSP primitives and the stage contract
//!
//! Everything the effect stages are built from lives here, with zero
//! allocation in the audio path.
//!
//! # Stage contract
//!
//! - [`Effect`] - Object-safe trait for every stage: mono, stereo and block processing
//! - [`ParameterInfo`] - Index-based parameter introspection used by the router
//! - [`ParamDescriptor`] - Range, unit and scale of one parameter, with
//!   [`normalize`](ParamDescriptor::normalize) / [`denormalize`](ParamDescriptor::denormalize)
//!
//! ## Parameter Smoothing
//!
//! Controller values arrive as quantized 7-bit steps. Every stage parameter is a
//! [`SmoothedParam`] so a step turns into an exponential glide instead of a click.
//!
//! ## Building blocks
//!
//! - [`InterpolatedDelay`] - Variable-length delay with fractional reads
//! - [`CombFilter`] / [`AllpassFilter`] - Freeverb-style reverb sections
//! - [`Lfo`] - Low-frequency oscillator for modulation
//! - [`EnvelopeFollower`] - Amplitude detection for dynamics
//! - Math: [`db_to_linear`], [`linear_to_db`], [`flush_denormal`], [`wet_dry_mix`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build for embedded targets:
//!
//! ```toml
//! [dependencies]
//! potlink-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod comb;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod lfo;
pub mod math;
pub mod param;
pub mod param_info;

pub use allpass::AllpassFilter;
pub use comb::CombFilter;
pub use delay::InterpolatedDelay;
pub use effect::Effect;
pub use envelope::EnvelopeFollower;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    db_to_linear, flush_denormal, linear_to_db, ms_to_samples, wet_dry_mix, wet_dry_mix_stereo,
};
pub use param::SmoothedParam;
pub use param_info::{ParamDescriptor, ParamScale, ParamUnit, ParameterInfo};
