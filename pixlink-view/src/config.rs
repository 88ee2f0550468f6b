//! Configuration for the viewer.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pixlink_core::transport::LineConfig;
use pixlink_core::wire::{BAUD_RATE, BITS_PER_COLOR, SCREEN_HEIGHT, SCREEN_WIDTH};
use pixlink_core::{FrameFormat, LinkConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Serial link settings.
    pub link: LinkSettings,
    /// Display geometry and rendering.
    pub display: DisplaySettings,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Transport kind: "tcp" or "tty".
    pub transport: String,
    /// TCP address of a simulated device (for transport = "tcp").
    pub address: String,
    /// Serial device path (for transport = "tty").
    pub device: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Boot-noise purge window in milliseconds.
    pub boot_purge_ms: u64,
    /// Decode tick period in milliseconds.
    pub decode_interval_ms: u64,
    /// Throughput publish period in milliseconds.
    pub throughput_interval_ms: u64,
}

/// Display geometry and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Color depth of the device's stream in bits per sample.
    pub bits_per_color: u8,
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Render incoming frames as ASCII to stdout.
    pub ascii: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            link: LinkSettings::default(),
            display: DisplaySettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            transport: "tty".into(),
            address: "127.0.0.1:7411".into(),
            device: "/dev/ttyACM0".into(),
            baud_rate: BAUD_RATE,
            buffer_size: 4096,
            boot_purge_ms: 1000,
            decode_interval_ms: 20,
            throughput_interval_ms: 1000,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            bits_per_color: BITS_PER_COLOR,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            ascii: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// How a [`ViewConfig::load`] call resolved.
///
/// Returned alongside the config instead of logged in place: loading
/// happens before the tracing subscriber exists (the log level lives
/// in the config), so the caller reports it once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parsed from the file.
    Loaded,
    /// No file at the path; defaults used.
    Missing,
    /// File present but unparseable; defaults used.
    Invalid(String),
}

impl ViewConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> (Self, LoadOutcome) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => (cfg, LoadOutcome::Loaded),
                Err(e) => (Self::default(), LoadOutcome::Invalid(e.to_string())),
            },
            Err(_) => (Self::default(), LoadOutcome::Missing),
        }
    }

    /// Convert link settings into a [`LinkConfig`].
    pub fn to_link_config(&self) -> LinkConfig {
        LinkConfig {
            line: LineConfig {
                baud_rate: self.link.baud_rate,
                buffer_size: self.link.buffer_size.max(64),
            },
            format: FrameFormat::new(
                self.display.bits_per_color.clamp(1, 7),
                self.display.width,
                self.display.height,
            ),
            boot_purge: Duration::from_millis(self.link.boot_purge_ms),
            decode_interval: Duration::from_millis(self.link.decode_interval_ms.max(1)),
            throughput_interval: Duration::from_millis(self.link.throughput_interval_ms.max(100)),
            ..LinkConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("baud_rate"));
        assert!(text.contains("bits_per_color"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.link.baud_rate, BAUD_RATE);
        assert_eq!(parsed.display.width, SCREEN_WIDTH);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let (cfg, outcome) = ViewConfig::load(Path::new("/nonexistent/pixlink-view.toml"));
        assert_eq!(outcome, LoadOutcome::Missing);
        assert_eq!(cfg.link.baud_rate, BAUD_RATE);
    }

    #[test]
    fn invalid_config_reports_and_falls_back() {
        let path = std::env::temp_dir().join("pixlink-view-invalid-config.toml");
        std::fs::write(&path, "link = \"not a table\"").unwrap();
        let (cfg, outcome) = ViewConfig::load(&path);
        assert!(matches!(outcome, LoadOutcome::Invalid(_)));
        assert_eq!(cfg.display.width, SCREEN_WIDTH);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn to_link_config_clamps() {
        let mut cfg = ViewConfig::default();
        cfg.display.bits_per_color = 9; // beyond the 7 payload bits
        cfg.link.decode_interval_ms = 0;
        let link = cfg.to_link_config();
        assert_eq!(link.format.bits_per_color, 7);
        assert_eq!(link.decode_interval, Duration::from_millis(1));
    }
}
