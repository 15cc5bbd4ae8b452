//! The settings file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use potlink_effects::chain::DEFAULT_SAMPLE_RATE;
use potlink_effects::{EffectChain, Route, default_routes};
use potlink_platform::ParameterBridge;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::default_settings_path;

/// Serial port the controller board usually enumerates as.
#[cfg(target_os = "macos")]
pub const DEFAULT_PORT: &str = "/dev/cu.usbmodem14301";
/// Serial port the controller board usually enumerates as.
#[cfg(target_os = "windows")]
pub const DEFAULT_PORT: &str = "COM3";
/// Serial port the controller board usually enumerates as.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Link speed of the controller board.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Complete settings file.
///
/// # TOML Format
///
/// ```toml
/// [serial]
/// port = "/dev/ttyACM0"
/// baud_rate = 9600
/// read_timeout_ms = 50
/// reconnect_ms = 1000
///
/// [audio]
/// sample_rate = 48000
/// block_size = 256
///
/// [[routes]]
/// controller = 1
/// stage = "compressor"
/// parameter = "attack"
///
/// [[routes]]
/// controller = 64
/// stage = "reverb"
/// bypass = true
///
/// [[stages]]
/// stage = "delay"
/// bypassed = true
/// [stages.params]
/// time = 375.0
/// ```
///
/// Every section is optional. An empty `routes` list means the built-in
/// table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial link to the controller board.
    pub serial: SerialSettings,
    /// Audio stream.
    pub audio: AudioSettings,
    /// Controller routes; empty selects the built-in table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteConfig>,
    /// Per-stage startup settings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageConfig>,
}

/// `[serial]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path or name.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Longest a single read may block, so shutdown is noticed promptly.
    pub read_timeout_ms: u64,
    /// Delay between reopen attempts after the link drops; 0 means the
    /// reader gives up on link loss.
    pub reconnect_ms: u64,
    /// How long shutdown waits for the reader thread.
    pub join_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 50,
            reconnect_ms: 1000,
            join_timeout_ms: 500,
        }
    }
}

impl SerialSettings {
    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reconnect interval as a [`Duration`].
    pub fn reconnect_interval(&self) -> Option<Duration> {
        (self.reconnect_ms > 0).then(|| Duration::from_millis(self.reconnect_ms))
    }

    /// Join timeout as a [`Duration`].
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// `[audio]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Processing block size in frames.
    pub block_size: usize,
    /// Input device name; absent selects the system default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Output device name; absent selects the system default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE as u32,
            block_size: 256,
            input_device: None,
            output_device: None,
        }
    }
}

/// One `[[routes]]` entry. Exactly one of `parameter` and `bypass` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Controller number, 0–127.
    pub controller: u8,
    /// Stage label.
    pub stage: String,
    /// Parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Route to the stage's bypass switch instead of a parameter.
    #[serde(default, skip_serializing_if = "is_false")]
    pub bypass: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl RouteConfig {
    /// Convert to a chain [`Route`].
    pub fn to_route(&self) -> Result<Route, ConfigError> {
        match (&self.parameter, self.bypass) {
            (Some(param), false) => Ok(Route::parameter(
                self.controller,
                self.stage.clone(),
                param.clone(),
            )),
            (None, true) => Ok(Route::bypass(self.controller, self.stage.clone())),
            (Some(_), true) => Err(ConfigError::invalid(format!(
                "route for CC{} sets both `parameter` and `bypass`",
                self.controller
            ))),
            (None, false) => Err(ConfigError::invalid(format!(
                "route for CC{} needs `parameter` or `bypass = true`",
                self.controller
            ))),
        }
    }
}

/// One `[[stages]]` entry: startup state for a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage label.
    pub stage: String,
    /// Start bypassed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub bypassed: bool,
    /// Parameter values in plain units (dB, ms, Hz, …).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f32>,
}

impl StageConfig {
    /// Apply to `chain`. Call before the chain's first block so values take
    /// effect without smoothing.
    pub fn apply(&self, chain: &mut EffectChain) -> Result<(), ConfigError> {
        chain.set_stage_bypassed(&self.stage, self.bypassed)?;
        for (name, &value) in &self.params {
            chain.set_stage_param(&self.stage, name, value)?;
        }
        Ok(())
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` if given. Otherwise load the default settings file
    /// if it exists, or fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = default_settings_path();
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            tracing::debug!(path = %default_path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values a parser cannot: rates and sizes are positive, a read
    /// never outlasts the shutdown wait, route controllers are in range and
    /// every route names exactly one target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::invalid("serial.baud_rate must be positive"));
        }
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::invalid("serial.port must not be empty"));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::invalid("serial.read_timeout_ms must be positive"));
        }
        // the reader checks for shutdown between reads
        if self.serial.read_timeout_ms >= self.serial.join_timeout_ms {
            return Err(ConfigError::invalid(format!(
                "serial.read_timeout_ms ({}) must be below serial.join_timeout_ms ({})",
                self.serial.read_timeout_ms, self.serial.join_timeout_ms
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::invalid("audio.sample_rate must be positive"));
        }
        if self.audio.block_size == 0 {
            return Err(ConfigError::invalid("audio.block_size must be positive"));
        }
        for route in &self.routes {
            if route.controller > 127 {
                return Err(ConfigError::invalid(format!(
                    "route controller {} is out of range (0-127)",
                    route.controller
                )));
            }
            route.to_route()?;
        }
        for stage in &self.stages {
            if let Some((name, value)) = stage.params.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ConfigError::invalid(format!(
                    "{}.{name} must be a finite number, got {value}",
                    stage.stage
                )));
            }
        }
        Ok(())
    }

    /// Routes to build the chain with: the configured list, or the
    /// built-in table if none are configured.
    pub fn routes(&self) -> Result<Vec<Route>, ConfigError> {
        if self.routes.is_empty() {
            return Ok(default_routes());
        }
        self.routes.iter().map(RouteConfig::to_route).collect()
    }

    /// Build an effect chain with these routes and stage settings.
    ///
    /// The chain is not configured yet; the caller configures it once the
    /// stream's actual sample rate and block size are known.
    pub fn build_chain(
        &self,
        bridge: Arc<ParameterBridge>,
    ) -> Result<EffectChain, ConfigError> {
        let mut chain = EffectChain::with_routes(bridge, self.routes()?)?;
        for stage in &self.stages {
            stage.apply(&mut chain)?;
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.audio.block_size, 256);
        assert_eq!(settings.routes().unwrap(), default_routes());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings = Settings::from_toml_str("[serial]\nbaud_rate = 115200\n").unwrap();
        assert_eq!(settings.serial.baud_rate, 115200);
        assert_eq!(settings.serial.port, DEFAULT_PORT);
        assert_eq!(settings.serial.reconnect_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_baud_is_invalid() {
        let err = Settings::from_toml_str("[serial]\nbaud_rate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn zero_read_timeout_is_invalid() {
        let err = Settings::from_toml_str("[serial]\nread_timeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("read_timeout_ms"), "{err}");
    }

    #[test]
    fn read_timeout_must_be_below_join_timeout() {
        let toml = "[serial]\nread_timeout_ms = 60000\njoin_timeout_ms = 500\n";
        assert!(matches!(Settings::from_toml_str(toml), Err(ConfigError::Invalid(_))));
        let equal = "[serial]\nread_timeout_ms = 500\njoin_timeout_ms = 500\n";
        assert!(Settings::from_toml_str(equal).is_err());
        let ok = "[serial]\nread_timeout_ms = 100\njoin_timeout_ms = 500\n";
        assert!(Settings::from_toml_str(ok).is_ok());
    }

    #[test]
    fn zero_block_size_is_invalid() {
        let err = Settings::from_toml_str("[audio]\nblock_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("block_size"));
    }

    #[test]
    fn controller_above_127_is_invalid() {
        let toml = "[[routes]]\ncontroller = 128\nstage = \"delay\"\nparameter = \"time\"\n";
        assert!(matches!(Settings::from_toml_str(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn route_needs_exactly_one_target() {
        let neither = "[[routes]]\ncontroller = 3\nstage = \"delay\"\n";
        assert!(Settings::from_toml_str(neither).is_err());
        let both =
            "[[routes]]\ncontroller = 3\nstage = \"delay\"\nparameter = \"time\"\nbypass = true\n";
        assert!(Settings::from_toml_str(both).is_err());
    }

    #[test]
    fn zero_reconnect_disables_retry() {
        let settings = Settings::from_toml_str("[serial]\nreconnect_ms = 0\n").unwrap();
        assert_eq!(settings.serial.reconnect_interval(), None);
    }

    #[test]
    fn route_config_converts() {
        let cfg = RouteConfig {
            controller: 9,
            stage: "reverb".into(),
            parameter: None,
            bypass: true,
        };
        assert_eq!(cfg.to_route().unwrap(), Route::bypass(9, "reverb"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Settings::from_toml_str("[serial\nport = 3").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut settings = Settings::default();
        settings.serial.port = "/dev/ttyUSB1".into();
        settings.serial.reconnect_ms = 0;
        settings.routes.push(RouteConfig {
            controller: 4,
            stage: "compressor".into(),
            parameter: Some("threshold".into()),
            bypass: false,
        });
        settings.stages.push(StageConfig {
            stage: "delay".into(),
            bypassed: true,
            params: BTreeMap::from([("time".to_string(), 375.0)]),
        });
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }
}
