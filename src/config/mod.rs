//! Detector tuning parameters and their runtime reload.

pub mod reload;

pub use reload::{ConfigHandle, ConfigWatcher};

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Where 3D points for each flow endpoint come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointSource {
    /// Back-project the depth image through the camera intrinsics.
    #[default]
    Depth,
    /// Triangulate from the disparity map (z = f * T / d).
    Disparity,
}

/// All tunables of the moving object detector.
///
/// Every key is optional in YAML; missing keys keep their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Stride (pixels) of the sampling grid over the previous left image.
    pub downsample_scale: usize,

    /// Minimum speed (m/s) for a flow to be considered moving.
    /// Slower flows are still drawn in the raw flow cloud.
    pub moving_flow_length: f64,

    /// Maximum distance (m) between flow start points in one cluster.
    pub flow_start_diff: f64,

    /// Maximum difference (m) between flow lengths in one cluster.
    pub flow_length_diff: f64,

    /// Maximum angle (rad) between flow directions in one cluster.
    pub flow_radian_diff: f64,

    /// Per-axis speed (m/s) mapped to full color saturation.
    pub flow_axis_max: f64,

    /// Allowed distance (px) between the right-image position predicted by
    /// the right flow and the one implied by the disparity map.
    pub matching_tolerance: f64,

    /// Clusters with fewer members are discarded.
    pub cluster_element_num: usize,

    pub point_source: PointSource,

    /// Emit a full match record per clustered flow.
    pub debug_records: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            downsample_scale: 10,
            moving_flow_length: 0.10,
            flow_start_diff: 0.10,
            flow_length_diff: 0.10,
            flow_radian_diff: 0.17,
            flow_axis_max: 0.5,
            matching_tolerance: 10.0,
            cluster_element_num: 10,
            point_source: PointSource::Depth,
            debug_records: false,
        }
    }
}

impl DetectorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse detector config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.downsample_scale == 0 {
            bail!("downsample_scale must be at least 1");
        }
        let non_negative = [
            ("moving_flow_length", self.moving_flow_length),
            ("flow_start_diff", self.flow_start_diff),
            ("flow_length_diff", self.flow_length_diff),
            ("flow_radian_diff", self.flow_radian_diff),
            ("matching_tolerance", self.matching_tolerance),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                bail!("{} must be non-negative, got {}", name, value);
            }
        }
        if self.flow_axis_max.is_nan() || self.flow_axis_max <= 0.0 {
            bail!("flow_axis_max must be positive, got {}", self.flow_axis_max);
        }
        Ok(())
    }
}
