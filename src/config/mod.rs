//! Session configuration.
//!
//! Everything here is read-only for the lifetime of a processing session.
//! Physical sizes are in millimetres.

mod file;

pub use file::{FileConfig, MetricsConfig, RunnerConfig};

use crate::contacts::FinderConfig;
use serde::{Deserialize, Serialize};

/// Configuration of one processing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical display width.
    pub width: f64,
    /// Physical display height.
    pub height: f64,
    /// Contact detection parameters.
    pub touch: TouchConfig,
    /// DFT stylus parameters.
    pub stylus: StylusConfig,
    /// Palm rejection cone parameters.
    pub cone: ConeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 260.0,
            height: 173.0,
            touch: TouchConfig::default(),
            stylus: StylusConfig::default(),
            cone: ConeConfig::default(),
        }
    }
}

/// How the resting level of a heatmap is estimated before blob detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Neutral {
    /// Most frequent cell value.
    Mode,
    /// Mean cell value.
    Average,
    /// A fixed level.
    Constant(f64),
}

/// Contact detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// A blob needs at least one cell above this value.
    pub activation_threshold: f64,
    /// Blobs grow through cells above this value.
    pub deactivation_threshold: f64,
    /// Resting level estimate.
    pub neutral: Neutral,
    /// Half-size of the fitting window, in cells.
    pub fitting_radius: usize,
    /// Largest per-frame movement that keeps a track identity (normalized).
    pub tracking_distance: f64,
    /// Largest relative size change that keeps a contact counting as stable.
    pub size_tolerance: f64,
    /// Consecutive frames before a contact is stable.
    pub stability_frames: u32,
    /// Smallest plausible contact, in mm.
    pub size_min: f64,
    /// Largest plausible contact, in mm.
    pub size_max: f64,
    /// Smallest accepted major/minor ratio.
    pub aspect_min: f64,
    /// Largest accepted major/minor ratio; anything above is a palm.
    pub aspect_max: f64,
    /// Contacts reported per frame at most.
    pub max_contacts: usize,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.24,
            deactivation_threshold: 0.20,
            neutral: Neutral::Mode,
            fitting_radius: 2,
            tracking_distance: 0.2,
            size_tolerance: 0.5,
            stability_frames: 3,
            size_min: 1.0,
            size_max: 40.0,
            aspect_min: 1.0,
            aspect_max: 2.5,
            max_contacts: 16,
        }
    }
}

/// DFT stylus interpolation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylusConfig {
    /// Minimum peak antenna amplitude for a usable measurement.
    pub min_amplitude: f64,
    /// Antennas on each side of the peak included in the centroid.
    pub window_radius: usize,
    /// Distance between tip and secondary electrode, in mm.
    pub tilt_distance: f64,
    /// Row antenna count used when the device reports no metadata.
    pub default_rows: u32,
    /// Column antenna count used when the device reports no metadata.
    pub default_columns: u32,
    /// Pressure reported for a fully pressed tip.
    pub max_pressure: f64,
}

impl Default for StylusConfig {
    fn default() -> Self {
        Self {
            min_amplitude: 50.0,
            window_radius: 1,
            tilt_distance: 6.0,
            default_rows: 44,
            default_columns: 64,
            max_pressure: 4096.0,
        }
    }
}

/// Palm rejection cone parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConeConfig {
    /// Whether touch contacts are filtered against stylus cones.
    pub enabled: bool,
    /// Angular half-width, in degrees.
    pub angle: f64,
    /// Maximum reach, in mm.
    pub distance: f64,
    /// Updates older than this no longer keep a cone active.
    pub timeout_ms: u64,
    /// Age at which an old palm direction counts half as much as a new one.
    pub half_life_ms: u64,
}

impl Default for ConeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            angle: 30.0,
            distance: 50.0,
            timeout_ms: 1000,
            half_life_ms: 1000,
        }
    }
}

impl Config {
    /// Creates a configuration with the specified display size.
    pub fn with_display(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Length of the display diagonal.
    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0)
            || !self.width.is_finite()
            || !self.height.is_finite()
        {
            return Err(ConfigError::InvalidDisplaySize {
                width: self.width,
                height: self.height,
            });
        }

        let t = &self.touch;
        if !(0.0..=1.0).contains(&t.activation_threshold)
            || !(0.0..=1.0).contains(&t.deactivation_threshold)
            || t.deactivation_threshold > t.activation_threshold
        {
            return Err(ConfigError::InvalidThresholds);
        }
        if t.size_min > t.size_max || t.aspect_min > t.aspect_max || t.tracking_distance < 0.0 {
            return Err(ConfigError::InvalidThresholds);
        }
        if t.stability_frames == 0 {
            return Err(ConfigError::InvalidStability);
        }

        let c = &self.cone;
        if !(c.angle > 0.0 && c.angle < 180.0) || c.distance <= 0.0 {
            return Err(ConfigError::InvalidCone);
        }

        Ok(())
    }

    /// Contact finder parameters, with physical sizes relative to the
    /// display diagonal.
    pub fn contacts(&self) -> FinderConfig {
        let diagonal = self.diagonal();
        let t = &self.touch;

        FinderConfig {
            activation_threshold: t.activation_threshold,
            deactivation_threshold: t.deactivation_threshold,
            neutral: t.neutral,
            fitting_radius: t.fitting_radius.max(1),
            tracking_distance: t.tracking_distance,
            size_tolerance: t.size_tolerance,
            stability_frames: t.stability_frames.max(1),
            size_min: t.size_min / diagonal,
            size_max: t.size_max / diagonal,
            aspect_min: t.aspect_min,
            aspect_max: t.aspect_max,
            max_contacts: t.max_contacts,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The display has no area.
    #[error("invalid display size {width}x{height}: both dimensions must be positive")]
    InvalidDisplaySize {
        /// Configured width.
        width: f64,
        /// Configured height.
        height: f64,
    },
    /// Thresholds outside `[0, 1]` or out of order, or inverted shape limits.
    #[error("invalid contact detection thresholds")]
    InvalidThresholds,
    /// `stability_frames` is zero.
    #[error("stability requires at least one frame")]
    InvalidStability,
    /// Cone angle outside `(0, 180)` degrees or a non-positive reach.
    #[error("invalid rejection cone geometry")]
    InvalidCone,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let config = Config::with_display(0.0, 200.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDisplaySize { .. })
        ));
    }

    #[test]
    fn test_inverted_hysteresis_invalid() {
        let mut config = Config::default();
        config.touch.deactivation_threshold = 0.5;
        config.touch.activation_threshold = 0.3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds)
        ));
    }

    #[test]
    fn test_contacts_scales_by_diagonal() {
        let mut config = Config::with_display(300.0, 400.0);
        config.touch.size_max = 50.0;
        let finder = config.contacts();
        assert!((finder.size_max - 0.1).abs() < 1e-12);
    }
}
