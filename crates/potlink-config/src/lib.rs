//! Settings for the potlink host.
//!
//! One TOML file configures the serial link, the audio stream, the
//! controller routing table and the startup state of each effect stage.
//! Every section is optional; a missing file means built-in defaults.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use potlink_config::Settings;
//! use potlink_platform::ParameterBridge;
//!
//! let settings = Settings::load_or_default(None).unwrap();
//! let bridge = Arc::new(ParameterBridge::new());
//! let mut chain = settings.build_chain(bridge).unwrap();
//! chain
//!     .configure(settings.audio.sample_rate as f32, settings.audio.block_size)
//!     .unwrap();
//! ```

mod error;
mod settings;

/// Platform-specific configuration paths.
pub mod paths;

pub use error::ConfigError;
pub use paths::{default_settings_path, user_config_dir};
pub use settings::{
    AudioSettings, DEFAULT_BAUD_RATE, DEFAULT_PORT, RouteConfig, SerialSettings, Settings,
    StageConfig,
};
