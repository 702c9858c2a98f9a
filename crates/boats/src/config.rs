use std::fs;
use std::path::Path;

use schemars::{JsonSchema, schema::RootSchema, schema_for};
use serde::{Deserialize, Serialize};

use crate::error::{BoatError, Result};

/// Band pair of the normalized-difference water index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct WaterIndexConfig {
    /// Band counted positively, the near-infrared band on 8-band imagery
    pub positive_band: usize,
    /// Band counted negatively, the coastal band on 8-band imagery
    pub negative_band: usize,
}

impl Default for WaterIndexConfig {
    fn default() -> Self {
        Self {
            positive_band: 7,
            negative_band: 0,
        }
    }
}

/// Tunables of the segmentation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Water bodies and land holes smaller than this are not real features
    pub min_feature_size_m2: f64,
    /// Candidates are kept when their solidity is strictly above this
    pub solidity_threshold: f64,
    /// Gaussian standard deviation in pixels, 0 disables smoothing
    pub smoothing_sigma: f64,
    /// Kernel radius in standard deviations
    pub smoothing_truncate: f64,
    /// Otsu histogram resolution
    pub histogram_bins: usize,
    pub water_index: WaterIndexConfig,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_feature_size_m2: 400_000.0,
            solidity_threshold: 0.9,
            smoothing_sigma: 1.0,
            smoothing_truncate: 4.0,
            histogram_bins: 256,
            water_index: WaterIndexConfig::default(),
        }
    }
}

impl SegmentationConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SegmentationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: SegmentationConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(BoatError::InvalidParameter(format!(
                "unsupported config format {}, use .toml or .json",
                path.display()
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BoatError::InvalidParameter(msg));

        if !self.min_feature_size_m2.is_finite() || self.min_feature_size_m2 < 0.0 {
            return invalid(format!(
                "min_feature_size_m2 must be a non-negative area, got {}",
                self.min_feature_size_m2
            ));
        }
        if !(0.0..=1.0).contains(&self.solidity_threshold) {
            return invalid(format!(
                "solidity_threshold must lie in [0, 1], got {}",
                self.solidity_threshold
            ));
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return invalid(format!(
                "smoothing_sigma must be non-negative, got {}",
                self.smoothing_sigma
            ));
        }
        if !self.smoothing_truncate.is_finite() || self.smoothing_truncate <= 0.0 {
            return invalid(format!(
                "smoothing_truncate must be positive, got {}",
                self.smoothing_truncate
            ));
        }
        if self.histogram_bins < 2 {
            return invalid(format!(
                "histogram_bins must be at least 2, got {}",
                self.histogram_bins
            ));
        }
        if self.water_index.positive_band == self.water_index.negative_band {
            return invalid(format!(
                "water index bands must differ, both are {}",
                self.water_index.positive_band
            ));
        }
        Ok(())
    }

    /// JSON schema of the configuration file
    pub fn schema() -> RootSchema {
        schema_for!(SegmentationConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SegmentationConfig::default();
        assert_eq!(config.min_feature_size_m2, 400_000.0);
        assert_eq!(config.solidity_threshold, 0.9);
        assert_eq!(config.histogram_bins, 256);
        assert_eq!(config.water_index.positive_band, 7);
        assert_eq!(config.water_index.negative_band, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SegmentationConfig::from_toml(
            r#"
            min_feature_size_m2 = 40000.0

            [water_index]
            positive_band = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.min_feature_size_m2, 40_000.0);
        assert_eq!(config.solidity_threshold, 0.9);
        assert_eq!(config.water_index.positive_band, 3);
        assert_eq!(config.water_index.negative_band, 0);
    }

    #[test]
    fn test_json_and_toml_round_trip() {
        let config = SegmentationConfig {
            solidity_threshold: 0.75,
            smoothing_sigma: 0.0,
            ..Default::default()
        };
        assert_eq!(SegmentationConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
        assert_eq!(SegmentationConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let bad = [
            SegmentationConfig {
                min_feature_size_m2: -1.0,
                ..Default::default()
            },
            SegmentationConfig {
                solidity_threshold: 1.2,
                ..Default::default()
            },
            SegmentationConfig {
                smoothing_sigma: f64::NAN,
                ..Default::default()
            },
            SegmentationConfig {
                smoothing_truncate: 0.0,
                ..Default::default()
            },
            SegmentationConfig {
                histogram_bins: 1,
                ..Default::default()
            },
            SegmentationConfig {
                water_index: WaterIndexConfig {
                    positive_band: 2,
                    negative_band: 2,
                },
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(BoatError::InvalidParameter(_))
            ));
        }
        assert!(SegmentationConfig::from_json(r#"{"histogram_bins": 0}"#).is_err());
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            SegmentationConfig::from_file("settings.yaml"),
            Err(BoatError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = serde_json::to_value(SegmentationConfig::schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("min_feature_size_m2").is_some());
        assert!(properties.get("water_index").is_some());
    }
}
