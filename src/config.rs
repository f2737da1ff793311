//! Pipeline configuration.
//!
//! All thresholds and scale constants are configuration, not hardcoded
//! assumptions; in particular the gap-tolerance policy for reappearing
//! structures lives here.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub tracking: TrackingConfig,
    pub graph: GraphConfig,
    pub logging: LoggingConfig,
}

/// Z-disc segmentation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Sigma of the Gaussian smoothing applied after the Laplacian filter.
    pub gaussian_sigma: f64,
    /// Connected components with fewer pixels than this are discarded.
    pub min_component_size: usize,
    /// Components larger than this are kept but flagged as split
    /// candidates (two z-discs merged into one blob).
    pub max_component_size: usize,
    /// Detections with confidence below this are discarded.
    pub min_confidence: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            gaussian_sigma: 1.0,
            min_component_size: 8,
            max_component_size: 400,
            min_confidence: 0.05,
        }
    }
}

/// Frame-to-frame linking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Frames a track may go unobserved before it is closed. A structure
    /// reappearing within this window extends its original track; after
    /// it, a new track is opened.
    pub gap_tolerance: u32,
    /// Matches with a combined cost above this are rejected.
    pub cost_threshold: f64,
    /// Normalization scale for the positional cost term, pixels.
    pub position_scale: f64,
    /// Normalization scale for the angular cost term, radians.
    pub angle_scale: f64,
    /// Weight of the angular term relative to the positional term.
    pub angle_weight: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            gap_tolerance: 3,
            cost_threshold: 4.0,
            position_scale: 4.0,
            angle_scale: std::f64::consts::FRAC_PI_4,
            angle_weight: 0.5,
        }
    }
}

/// Sarcomere inference bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum center-to-center distance between two z-discs forming a
    /// sarcomere, pixels.
    pub max_link_distance: f64,
    /// Maximum angular deviation, radians, for both the orientation
    /// difference between the two discs and the misalignment of the
    /// connecting vector from the discs' shared normal.
    pub max_angle_difference: f64,
    /// A disc pair must stay adjacent for at least this many contiguous
    /// frames before a sarcomere node is materialized.
    pub min_sarcomere_frames: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_link_distance: 20.0,
            max_angle_difference: std::f64::consts::FRAC_PI_4,
            min_sarcomere_frames: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a stage silently misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.detection.gaussian_sigma <= 0.0 {
            return Err(Error::Config("gaussian_sigma must be positive".into()));
        }
        if self.detection.min_component_size == 0 {
            return Err(Error::Config("min_component_size must be at least 1".into()));
        }
        if self.detection.max_component_size < self.detection.min_component_size {
            return Err(Error::Config(
                "max_component_size must not be below min_component_size".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(Error::Config("min_confidence must be in [0, 1]".into()));
        }
        if self.tracking.cost_threshold <= 0.0 {
            return Err(Error::Config("cost_threshold must be positive".into()));
        }
        if self.tracking.position_scale <= 0.0 || self.tracking.angle_scale <= 0.0 {
            return Err(Error::Config(
                "position_scale and angle_scale must be positive".into(),
            ));
        }
        if self.tracking.angle_weight < 0.0 {
            return Err(Error::Config("angle_weight must not be negative".into()));
        }
        if self.graph.max_link_distance <= 0.0 {
            return Err(Error::Config("max_link_distance must be positive".into()));
        }
        if self.graph.min_sarcomere_frames == 0 {
            return Err(Error::Config(
                "min_sarcomere_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
