use std::fs;
use std::path::Path;

use boats::{BoatError, GeoTransform, ImageMetadata, MultiBandImage, SegmentationConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    BoatError(#[from] BoatError),
    #[error("Scene has no bands")]
    EmptyScene,
    #[error("Band {band} row {row} has {found} pixels, expected {expected}")]
    RaggedBand {
        band: usize,
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Band {band} has {found} rows, expected {expected}")]
    BandHeight {
        band: usize,
        found: usize,
        expected: usize,
    },
}

/// A multispectral scene exported as JSON.
///
/// Pixel values are band-major, then row-major; `null` marks missing data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneDocument {
    /// Meters per pixel edge
    pub ground_sample_distance_m: Option<f64>,
    /// Affine coefficients `[a, b, c, d, e, f]`, identity when absent
    #[serde(default)]
    pub transform: Option<[f64; 6]>,
    pub bands: Vec<Vec<Vec<Option<f32>>>>,
}

impl SceneDocument {
    /// Load a scene from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a scene from a JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn geo_transform(&self) -> GeoTransform {
        match self.transform {
            Some([a, b, c, d, e, f]) => GeoTransform::new(a, b, c, d, e, f),
            None => GeoTransform::default(),
        }
    }

    /// Convert to the library's image type, checking every band has the same shape.
    pub fn into_image(self) -> Result<MultiBandImage, CliError> {
        let metadata = ImageMetadata::from_optional(self.ground_sample_distance_m)?;
        let transform = self.geo_transform();

        let first = self.bands.first().ok_or(CliError::EmptyScene)?;
        let height = first.len();
        let width = first.first().map_or(0, Vec::len);

        let mut band_data = Vec::with_capacity(self.bands.len());
        for (band, rows) in self.bands.into_iter().enumerate() {
            if rows.len() != height {
                return Err(CliError::BandHeight {
                    band,
                    found: rows.len(),
                    expected: height,
                });
            }
            let mut data = Vec::with_capacity(width * height);
            for (row, values) in rows.into_iter().enumerate() {
                if values.len() != width {
                    return Err(CliError::RaggedBand {
                        band,
                        row,
                        found: values.len(),
                        expected: width,
                    });
                }
                data.extend(values.into_iter().map(|v| v.unwrap_or(f32::NAN)));
            }
            band_data.push(data);
        }

        Ok(MultiBandImage::from_band_data(
            width as u32,
            height as u32,
            band_data,
            transform,
            metadata,
        )?)
    }
}

/// Load segmentation settings, falling back to the defaults without a path.
pub fn load_config(path: Option<&Path>) -> Result<SegmentationConfig, CliError> {
    Ok(match path {
        Some(path) => SegmentationConfig::from_file(path)?,
        None => SegmentationConfig::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_to_image() {
        let scene = SceneDocument::from_json(
            r#"{
                "ground_sample_distance_m": 2.0,
                "transform": [2.0, 0.0, 500000.0, 0.0, -2.0, 4000000.0],
                "bands": [
                    [[0.1, 0.2, 0.3], [0.4, null, 0.6]],
                    [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]
                ]
            }"#,
        )
        .unwrap();
        let image = scene.into_image().unwrap();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.band_count(), 2);
        assert_eq!(image.ground_sample_distance(), 2.0);
        assert_eq!(image.transform().apply(1.0, 1.0), (500_002.0, 3_999_998.0));
        assert!(!image.transform().is_identity());
        let band = image.band(0).unwrap();
        assert_eq!(band.get_pixel(2, 0)[0], 0.3);
        assert!(band.get_pixel(1, 1)[0].is_nan());
    }

    #[test]
    fn test_missing_gsd() {
        let scene = SceneDocument::from_json(r#"{"bands": [[[0.5]]]}"#).unwrap();
        assert_eq!(scene.geo_transform(), GeoTransform::default());
        assert!(scene.geo_transform().is_identity());
        assert!(matches!(
            scene.into_image(),
            Err(CliError::BoatError(BoatError::InvalidMetadata(_)))
        ));
    }

    #[test]
    fn test_ragged_scene() {
        let scene = SceneDocument::from_json(
            r#"{"ground_sample_distance_m": 1.0, "bands": [[[0.1, 0.2], [0.3]]]}"#,
        )
        .unwrap();
        assert!(matches!(
            scene.into_image(),
            Err(CliError::RaggedBand { band: 0, row: 1, .. })
        ));

        let scene = SceneDocument::from_json(
            r#"{"ground_sample_distance_m": 1.0, "bands": [[[0.1]], [[0.1], [0.2]]]}"#,
        )
        .unwrap();
        assert!(matches!(
            scene.into_image(),
            Err(CliError::BandHeight { band: 1, .. })
        ));

        let scene =
            SceneDocument::from_json(r#"{"ground_sample_distance_m": 1.0, "bands": []}"#).unwrap();
        assert!(matches!(scene.into_image(), Err(CliError::EmptyScene)));
    }

    #[test]
    fn test_default_config() {
        assert_eq!(load_config(None).unwrap(), SegmentationConfig::default());
    }
}
