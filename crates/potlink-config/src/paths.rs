//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/potlink/`
//! - macOS: `~/Library/Application Support/potlink/`
//! - Windows: `%APPDATA%\potlink\`

use std::path::PathBuf;

const APP_NAME: &str = "potlink";

/// File name of the settings file inside [`user_config_dir`].
pub const SETTINGS_FILE: &str = "potlink.toml";

/// User configuration directory. Falls back to `./potlink` if the platform
/// config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Where settings are read from when no path is given.
pub fn default_settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}
