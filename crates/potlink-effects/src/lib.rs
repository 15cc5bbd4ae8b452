//! Effect stages and the controller-driven effect chain.
//!
//! Five processors built on `potlink-core`, each implementing
//! [`Effect`](potlink_core::Effect) and
//! [`ParameterInfo`](potlink_core::ParameterInfo):
//!
//! | Stage | Parameters |
//! |-------|------------|
//! | [`Compressor`] | threshold, ratio, attack, release, makeup |
//! | [`Gain`] | gain |
//! | [`Chorus`] | rate, depth, centre_delay, feedback, mix |
//! | [`Delay`] | time, feedback, mix |
//! | [`Reverb`] | room_size, damping, wet_level, dry_level, width, freeze |
//!
//! [`EffectChain`] runs them in a fixed order and pulls new controller
//! values from a [`ParameterBridge`](potlink_platform::ParameterBridge) once
//! per block, through a table of [`Route`]s.

pub mod chain;
pub mod chorus;
pub mod compressor;
pub mod delay;
pub mod error;
pub mod gain;
pub mod reverb;
pub mod routing;
pub mod stage;

pub use chain::{ChainState, EffectChain, STAGE_COUNT, STAGE_LABELS};
pub use chorus::Chorus;
pub use compressor::Compressor;
pub use delay::Delay;
pub use error::ChainError;
pub use gain::Gain;
pub use reverb::Reverb;
pub use routing::{ResolvedRoute, ResolvedTarget, Route, RouteTarget, default_routes};
pub use stage::{EffectStage, StageKind};
