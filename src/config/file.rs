//! TOML configuration file format.

use super::{Config, ConeConfig, ConfigError, StylusConfig, TouchConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration file format.
///
/// ```toml
/// [display]
/// width = 260.0
/// height = 173.0
///
/// [touch]
/// stability_frames = 3
///
/// [cone]
/// enabled = true
/// angle = 30.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Physical display size.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Contact detection.
    #[serde(default)]
    pub touch: TouchConfig,
    /// DFT stylus interpolation.
    #[serde(default)]
    pub stylus: StylusConfig,
    /// Palm rejection cone.
    #[serde(default)]
    pub cone: ConeConfig,
    /// Read loop.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Prometheus exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Physical display dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width in mm.
    pub width: f64,
    /// Height in mm.
    pub height: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let config = Config::default();
        Self {
            width: config.width,
            height: config.height,
        }
    }
}

/// Read loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Consecutive source errors tolerated before giving up.
    pub max_errors: u32,
    /// Number of events to process; 0 runs until stopped.
    pub event_count: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_errors: 50,
            event_count: 0,
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session().validate()?;
        Ok(config)
    }

    /// The processing session configuration.
    pub fn session(&self) -> Config {
        Config {
            width: self.display.width,
            height: self.display.height,
            touch: self.touch.clone(),
            stylus: self.stylus.clone(),
            cone: self.cone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Neutral;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [display]
            width = 300.0
            height = 200.0

            [cone]
            angle = 45.0
            "#,
        )
        .unwrap();

        let session = config.session();
        assert_eq!(session.width, 300.0);
        assert_eq!(session.cone.angle, 45.0);
        assert!(session.cone.enabled);
        assert_eq!(session.touch.stability_frames, 3);
        assert_eq!(config.runner.max_errors, 50);
    }

    #[test]
    fn test_partial_sections_fill_missing_keys() {
        let config = FileConfig::from_toml(
            r#"
            [display]
            width = 300.0

            [runner]
            event_count = 10

            [metrics]
            "#,
        )
        .unwrap();

        assert_eq!(config.display.width, 300.0);
        assert_eq!(config.display.height, DisplayConfig::default().height);
        assert_eq!(config.runner.event_count, 10);
        assert_eq!(config.runner.max_errors, 50);
        assert_eq!(config.metrics.port, 9090);
    }

    #[test]
    fn test_neutral_modes_parse() {
        let config = FileConfig::from_toml(
            r#"
            [touch]
            neutral = { constant = 0.1 }
            "#,
        )
        .unwrap();
        assert_eq!(config.touch.neutral, Neutral::Constant(0.1));
    }

    #[test]
    fn test_zero_display_rejected() {
        let result = FileConfig::from_toml(
            r#"
            [display]
            width = 0.0
            height = 200.0
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDisplaySize { .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[touch\nwidth = "),
            Err(ConfigError::ParseError(_))
        ));
    }
}
