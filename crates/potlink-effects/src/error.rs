//! Errors from building or configuring an [`EffectChain`](crate::EffectChain).

use thiserror::Error;

/// Reasons a chain cannot be built or configured as requested.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// A route or setting names a stage label the chain does not have.
    #[error("unknown stage `{0}`")]
    UnknownStage(String),

    /// The stage exists but has no parameter with that name.
    #[error("stage `{stage}` has no parameter `{param}`")]
    UnknownParameter {
        /// Stage label.
        stage: String,
        /// Requested parameter name.
        param: String,
    },

    /// Controller numbers run 0–127.
    #[error("controller {0} is out of range (0-127)")]
    ControllerOutOfRange(u8),

    /// Sample rate must be finite and positive.
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f32),

    /// Block size must be at least one sample.
    #[error("block size must be non-zero")]
    ZeroBlockSize,
}
