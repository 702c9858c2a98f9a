use tracing::debug;

use crate::{
    error::{BoatError, Result},
    traits::IndexCalculator,
    types::{Band, IndexRaster, MultiBandImage},
};

/// Normalized difference `(a - b) / (a + b)` per pixel.
///
/// Zero denominators are not trapped: the resulting `NaN`/`inf` values are
/// left for the thresholding stage to scrub.
pub fn normalized_difference(a: &Band, b: &Band) -> Result<IndexRaster> {
    if a.dimensions() != b.dimensions() {
        return Err(BoatError::ShapeMismatch {
            expected: a.dimensions(),
            found: b.dimensions(),
        });
    }

    let (width, height) = a.dimensions();
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&a, &b)| (a - b) / (a + b))
        .collect();

    IndexRaster::from_raw(width, height, data).ok_or(BoatError::ShapeMismatch {
        expected: (width, height),
        found: a.dimensions(),
    })
}

/// Water index from two bands of a multispectral image.
///
/// The default pairing uses band 7 (near infrared 2 on 8-band sensors) against
/// band 0 (coastal blue).
#[derive(Debug, Clone)]
pub struct WaterIndex {
    pub positive_band: usize,
    pub negative_band: usize,
}

impl WaterIndex {
    pub fn new(positive_band: usize, negative_band: usize) -> Self {
        Self {
            positive_band,
            negative_band,
        }
    }
}

impl Default for WaterIndex {
    fn default() -> Self {
        Self::new(7, 0)
    }
}

impl IndexCalculator for WaterIndex {
    fn calculate(&self, image: &MultiBandImage) -> Result<IndexRaster> {
        let positive = image.band(self.positive_band)?;
        let negative = image.band(self.negative_band)?;
        let index = normalized_difference(positive, negative)?;

        debug!(
            positive_band = self.positive_band,
            negative_band = self.negative_band,
            width = index.width(),
            height = index.height(),
            "computed water index"
        );
        Ok(index)
    }

    fn name(&self) -> &str {
        "water_index"
    }
}

/// Water index with the default band pairing.
pub fn calc_water_index(image: &MultiBandImage) -> Result<IndexRaster> {
    WaterIndex::default().calculate(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoTransform, ImageMetadata};

    fn eight_band_image(width: u32, height: u32, fill: impl Fn(usize, usize) -> f32) -> MultiBandImage {
        let pixels = (width * height) as usize;
        let bands = (0..8)
            .map(|band| (0..pixels).map(|i| fill(band, i)).collect())
            .collect();
        MultiBandImage::from_band_data(
            width,
            height,
            bands,
            GeoTransform::default(),
            ImageMetadata::new(1.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_water_index_values() {
        // band 7 = 0.6, band 0 = 0.2 -> (0.6 - 0.2) / 0.8 = 0.5
        let image = eight_band_image(3, 2, |band, _| match band {
            7 => 0.6,
            0 => 0.2,
            _ => 0.0,
        });
        let index = calc_water_index(&image).unwrap();
        assert_eq!(index.dimensions(), (3, 2));
        for p in index.pixels() {
            assert!((p[0] - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_identical_bands_give_zero() {
        let image = eight_band_image(4, 4, |band, i| {
            if band == 0 || band == 7 {
                0.1 + i as f32 * 0.05
            } else {
                1.0
            }
        });
        let index = calc_water_index(&image).unwrap();
        assert!(index.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn test_zero_denominator_propagates_non_finite() {
        let image = eight_band_image(2, 1, |band, i| match (band, i) {
            (0, 0) | (7, 0) => 0.0,
            (7, 1) => 0.3,
            (0, 1) => -0.3,
            _ => 0.5,
        });
        let index = calc_water_index(&image).unwrap();
        assert!(index.get_pixel(0, 0)[0].is_nan());
        assert!(index.get_pixel(1, 0)[0].is_infinite());
    }

    #[test]
    fn test_nan_band_value_propagates() {
        let image = eight_band_image(1, 1, |band, _| if band == 7 { f32::NAN } else { 0.2 });
        let index = calc_water_index(&image).unwrap();
        assert!(index.get_pixel(0, 0)[0].is_nan());
    }

    #[test]
    fn test_missing_band() {
        let image = MultiBandImage::from_band_data(
            1,
            1,
            vec![vec![0.1]; 4],
            GeoTransform::default(),
            ImageMetadata::new(1.0).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            calc_water_index(&image),
            Err(BoatError::MissingBand { index: 7, available: 4 })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Band::new(3, 3);
        let b = Band::new(3, 2);
        assert!(matches!(
            normalized_difference(&a, &b),
            Err(BoatError::ShapeMismatch { .. })
        ));
    }
}
