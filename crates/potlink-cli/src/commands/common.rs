//! Shared CLI helpers used across multiple commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use potlink_config::Settings;
use potlink_io::SerialLinkConfig;

/// Settings file and serial overrides shared by the link commands.
#[derive(Args, Debug, Clone, Default)]
pub struct LinkArgs {
    /// Settings file (default: user config dir, if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port (overrides the settings file)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (overrides the settings file)
    #[arg(short, long)]
    pub baud: Option<u32>,
}

impl LinkArgs {
    /// Load settings and apply the command-line overrides.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = load_settings(self.config.as_ref())?;
        if let Some(port) = &self.port {
            settings.serial.port.clone_from(port);
        }
        if let Some(baud) = self.baud {
            settings.serial.baud_rate = baud;
        }
        Ok(settings)
    }
}

/// Settings from `path`, or the user's settings file, or defaults.
pub fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    Settings::load_or_default(path.map(PathBuf::as_path)).with_context(|| match path {
        Some(p) => format!("loading settings from {}", p.display()),
        None => "loading user settings".to_string(),
    })
}

/// Serial link configuration from loaded settings.
pub fn link_config(settings: &Settings) -> SerialLinkConfig {
    let serial = &settings.serial;
    SerialLinkConfig {
        port: serial.port.clone(),
        baud_rate: serial.baud_rate,
        read_timeout: serial.read_timeout(),
        reconnect_interval: serial.reconnect_interval(),
        join_timeout: serial.join_timeout(),
    }
}

/// Parse a byte written as decimal (`64`) or hex (`0x40`), at most 127.
fn parse_data_byte(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    }
    .map_err(|e| format!("invalid number '{s}': {e}"))?;
    if value > 127 {
        return Err(format!("{value} is out of range (0-127)"));
    }
    Ok(value)
}

/// Parse `controller=value` for clap's `value_parser`.
pub fn parse_cc(s: &str) -> Result<(u8, u8), String> {
    let (controller, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid controller setting '{s}' (expected N=V)"))?;
    Ok((parse_data_byte(controller)?, parse_data_byte(value)?))
}
