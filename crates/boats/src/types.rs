use geo_types::Geometry;
use geojson::JsonObject;
use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::{BoatError, Result};

/// One spectral band: reflectance per pixel, `NaN` marks missing data.
pub type Band = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel spectral index scores.
pub type IndexRaster = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Water mask: [`WATER`] for water, 0 for everything else.
pub type BinaryMask = GrayImage;

/// Integer region labels, 0 is background.
pub type LabelRaster = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Mask value marking a water pixel.
pub const WATER: u8 = 255;

/// Returns true when a mask pixel is marked as water.
#[inline]
pub fn is_water(pixel: &Luma<u8>) -> bool {
    pixel[0] != 0
}

/// Affine pixel-to-world transform.
///
/// Follows the rasterio coefficient order:
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
/// Integer `(col, row)` addresses the top-left corner of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform with square pixels and no rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::new(pixel_size, 0.0, origin_x, 0.0, -pixel_size, origin_y)
    }

    /// Create from a GDAL-style array `[c, a, b, f, d, e]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self::new(coeffs[1], coeffs[2], coeffs[0], coeffs[4], coeffs[5], coeffs[3])
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Map a pixel-corner coordinate to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// The same mapping as a `geo` affine transform, for whole geometries.
    pub fn to_affine(&self) -> geo::AffineTransform<f64> {
        geo::AffineTransform::new(self.a, self.b, self.c, self.d, self.e, self.f)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for GeoTransform {
    /// Identity: world coordinates equal pixel-corner coordinates.
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }
}

/// Validated acquisition metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    ground_sample_distance_m: f64,
}

impl ImageMetadata {
    /// Fails with [`BoatError::InvalidMetadata`] unless the GSD is finite and positive.
    pub fn new(ground_sample_distance_m: f64) -> Result<Self> {
        validate_gsd(ground_sample_distance_m)?;
        Ok(Self {
            ground_sample_distance_m,
        })
    }

    /// Metadata as it arrives from an image source, where the GSD field may be absent.
    pub fn from_optional(ground_sample_distance_m: Option<f64>) -> Result<Self> {
        let gsd = ground_sample_distance_m.ok_or_else(|| {
            BoatError::InvalidMetadata("ground sample distance is missing".to_string())
        })?;
        Self::new(gsd)
    }

    /// Meters per pixel edge.
    pub fn ground_sample_distance(&self) -> f64 {
        self.ground_sample_distance_m
    }
}

pub(crate) fn validate_gsd(gsd: f64) -> Result<()> {
    if !gsd.is_finite() || gsd <= 0.0 {
        return Err(BoatError::InvalidMetadata(format!(
            "ground sample distance must be a positive number of meters, got {gsd}"
        )));
    }
    Ok(())
}

/// A stack of equally sized bands plus georeferencing.
#[derive(Debug, Clone)]
pub struct MultiBandImage {
    bands: Vec<Band>,
    transform: GeoTransform,
    metadata: ImageMetadata,
}

impl MultiBandImage {
    pub fn new(bands: Vec<Band>, transform: GeoTransform, metadata: ImageMetadata) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(BoatError::InvalidParameter(
                "a multi-band image needs at least one band".to_string(),
            ));
        };
        let expected = first.dimensions();
        if let Some(band) = bands.iter().find(|band| band.dimensions() != expected) {
            return Err(BoatError::ShapeMismatch {
                expected,
                found: band.dimensions(),
            });
        }

        Ok(Self {
            bands,
            transform,
            metadata,
        })
    }

    /// Build from row-major per-band pixel vectors.
    pub fn from_band_data(
        width: u32,
        height: u32,
        band_data: Vec<Vec<f32>>,
        transform: GeoTransform,
        metadata: ImageMetadata,
    ) -> Result<Self> {
        let bands = band_data
            .into_iter()
            .map(|data| {
                let len = data.len();
                let mismatch = BoatError::ShapeMismatch {
                    expected: (width, height),
                    found: (len as u32, 1),
                };
                // from_raw accepts buffers longer than width * height
                if len != width as usize * height as usize {
                    return Err(mismatch);
                }
                Band::from_raw(width, height, data).ok_or(mismatch)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(bands, transform, metadata)
    }

    pub fn band(&self, index: usize) -> Result<&Band> {
        self.bands.get(index).ok_or(BoatError::MissingBand {
            index,
            available: self.bands.len(),
        })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bands[0].dimensions()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn ground_sample_distance(&self) -> f64 {
        self.metadata.ground_sample_distance()
    }
}

/// Pixel classes of the land/water/boat segmentation raster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u32)]
pub enum SegmentClass {
    Land = 0,
    Water = 1,
    BoatCandidate = 2,
}

impl SegmentClass {
    pub fn value(self) -> u32 {
        self as u32
    }

    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Land),
            1 => Some(Self::Water),
            2 => Some(Self::BoatCandidate),
            _ => None,
        }
    }
}

/// Pixel tallies of a segmentation raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub land: usize,
    pub water: usize,
    pub boat_candidate: usize,
}

/// Per-region measurements of a label raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionProperties {
    pub label: u32,
    /// Pixel count
    pub area: usize,
    /// Pixels whose centres fall inside or on the convex hull of the region's pixel corners
    pub convex_area: f64,
    /// `area / convex_area`, in (0, 1]
    pub solidity: f64,
    /// `(min_row, min_col, max_row, max_col)`, inclusive
    pub bbox: (u32, u32, u32, u32),
    /// Mean `(row, col)` pixel index
    pub centroid: (f64, f64),
}

/// A vector region and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPolygon {
    /// `Polygon` or `MultiPolygon`
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl LabeledPolygon {
    /// Tag a geometry with `{"id": label}`.
    pub fn new(geometry: Geometry<f64>, label: u32) -> Self {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), serde_json::Value::from(label));
        Self {
            geometry,
            properties,
        }
    }

    pub fn label(&self) -> Option<u32> {
        self.properties
            .get("id")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn area(&self) -> f64 {
        use geo::Area;
        self.geometry.unsigned_area()
    }
}

/// Output of a full detection run over one image.
#[derive(Debug, Clone)]
pub struct BoatDetection {
    /// Boat-only label raster
    pub boats: LabelRaster,
    /// One entry per boat region, in world coordinates
    pub polygons: Vec<LabeledPolygon>,
}

impl BoatDetection {
    /// Number of distinct boat labels.
    pub fn boat_count(&self) -> usize {
        crate::algorithms::labeling::distinct_labels(&self.boats, 0).len()
    }

    pub fn image_width(&self) -> u32 {
        self.boats.width()
    }

    pub fn image_height(&self) -> u32 {
        self.boats.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn metadata() -> ImageMetadata {
        ImageMetadata::new(2.0).expect("valid gsd")
    }

    #[test]
    fn test_metadata_rejects_bad_gsd() {
        assert!(matches!(ImageMetadata::new(0.0), Err(BoatError::InvalidMetadata(_))));
        assert!(matches!(ImageMetadata::new(-1.5), Err(BoatError::InvalidMetadata(_))));
        assert!(matches!(ImageMetadata::new(f64::NAN), Err(BoatError::InvalidMetadata(_))));
        assert!(matches!(
            ImageMetadata::from_optional(None),
            Err(BoatError::InvalidMetadata(_))
        ));
        assert_eq!(ImageMetadata::from_optional(Some(0.5)).unwrap().ground_sample_distance(), 0.5);
    }

    #[test]
    fn test_image_rejects_mismatched_bands() {
        let bands = vec![Band::new(4, 4), Band::new(4, 3)];
        let err = MultiBandImage::new(bands, GeoTransform::default(), metadata()).unwrap_err();
        assert!(matches!(
            err,
            BoatError::ShapeMismatch {
                expected: (4, 4),
                found: (4, 3)
            }
        ));
    }

    #[test]
    fn test_image_band_lookup() {
        let image = MultiBandImage::from_band_data(
            2,
            1,
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            GeoTransform::default(),
            metadata(),
        )
        .expect("valid image");

        assert_eq!(image.band_count(), 2);
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.band(1).unwrap().get_pixel(1, 0)[0], 4.0);
        assert!(matches!(
            image.band(7),
            Err(BoatError::MissingBand { index: 7, available: 2 })
        ));
    }

    #[test]
    fn test_band_data_length_checked() {
        let result = MultiBandImage::from_band_data(
            2,
            2,
            vec![vec![1.0; 3]],
            GeoTransform::default(),
            metadata(),
        );
        assert!(matches!(result, Err(BoatError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_band_data_oversized_rejected() {
        let result = MultiBandImage::from_band_data(
            2,
            2,
            vec![vec![1.0; 9]],
            GeoTransform::default(),
            metadata(),
        );
        assert!(matches!(
            result,
            Err(BoatError::ShapeMismatch {
                expected: (2, 2),
                found: (9, 1)
            })
        ));
    }

    #[test]
    fn test_geotransform_apply() {
        let gt = GeoTransform::north_up(100.0, 200.0, 10.0);
        assert_eq!(gt.apply(0.0, 0.0), (100.0, 200.0));
        assert_eq!(gt.apply(2.0, 3.0), (120.0, 170.0));
        assert_eq!(GeoTransform::from_gdal(gt.to_gdal()), gt);
        assert!(GeoTransform::default().is_identity());
    }

    #[test]
    fn test_labeled_polygon_id() {
        let square = geo_types::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let labeled = LabeledPolygon::new(Geometry::Polygon(square), 42);
        assert_eq!(labeled.label(), Some(42));
        assert!((labeled.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_class_values() {
        assert_eq!(SegmentClass::BoatCandidate.value(), 2);
        assert_eq!(SegmentClass::from_value(1), Some(SegmentClass::Water));
        assert_eq!(SegmentClass::from_value(3), None);
        assert_eq!(SegmentClass::BoatCandidate.to_string(), "boat_candidate");
        let name: &'static str = SegmentClass::Land.into();
        assert_eq!(name, "land");

        use strum::IntoEnumIterator;
        for class in SegmentClass::iter() {
            assert_eq!(SegmentClass::from_value(class.value()), Some(class));
        }
    }
}
