pub mod builder;

use tracing::{debug, info};

use crate::{
    algorithms::{
        area::m2_to_cells,
        index::WaterIndex,
        labeling::{SolidityFilter, label_components},
        morphology::{MorphologicalCleaner, boat_candidates, class_counts},
        polygonize::labels_to_polygons,
        threshold::GaussianOtsuThresholder,
    },
    config::SegmentationConfig,
    error::Result,
    traits::{IndexCalculator, RegionFilter, Thresholder},
    types::{BoatDetection, LabelRaster, MultiBandImage, SegmentClass},
};

/// Default minimum size of a real water body or land hole.
pub const DEFAULT_MIN_FEATURE_SIZE_M2: f64 = 400_000.0;

/// Segmentation pipeline from a multispectral image to boat regions
pub struct BoatPipeline {
    index: Box<dyn IndexCalculator>,
    thresholder: Box<dyn Thresholder>,
    min_feature_size_m2: f64,
    filters: Vec<Box<dyn RegionFilter>>,
}

impl BoatPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        index: Box<dyn IndexCalculator>,
        thresholder: Box<dyn Thresholder>,
        min_feature_size_m2: f64,
        filters: Vec<Box<dyn RegionFilter>>,
    ) -> Self {
        Self {
            index,
            thresholder,
            min_feature_size_m2,
            filters,
        }
    }

    /// Build a pipeline from validated configuration
    pub fn from_config(config: &SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::builder()
            .set_index_calculator(WaterIndex::new(
                config.water_index.positive_band,
                config.water_index.negative_band,
            ))
            .set_thresholder(GaussianOtsuThresholder {
                sigma: config.smoothing_sigma,
                truncate: config.smoothing_truncate,
                bins: config.histogram_bins,
            })
            .min_feature_size_m2(config.min_feature_size_m2)
            .add_filter(SolidityFilter::new(config.solidity_threshold)?)
            .build())
    }

    /// Classify every pixel as land (0), water (1) or boat candidate (2).
    ///
    /// A uniform index has no water/land split; the whole image is then
    /// reported as water and no candidates are produced.
    pub fn segment_land_water_and_boats(&self, image: &MultiBandImage) -> Result<LabelRaster> {
        let min_cells = m2_to_cells(self.min_feature_size_m2, image.ground_sample_distance())?;

        let index = self.index.calculate(image)?;
        let binarized = self.thresholder.binarize(&index)?;

        let (width, height) = image.dimensions();
        if binarized.uniform {
            return Ok(LabelRaster::from_pixel(
                width,
                height,
                image::Luma([SegmentClass::Water.value()]),
            ));
        }

        let segmentation = MorphologicalCleaner::new(min_cells).clean(&binarized.mask);
        let counts = class_counts(&segmentation);
        debug!(
            index = self.index.name(),
            threshold = binarized.threshold,
            min_cells,
            land = counts.land,
            water = counts.water,
            boat_candidates = counts.boat_candidate,
            "segmented land, water and boat candidates"
        );
        Ok(segmentation)
    }

    /// Label the boat candidates and keep the regions every filter accepts.
    pub fn segment_boats(&self, image: &MultiBandImage) -> Result<LabelRaster> {
        let segmentation = self.segment_land_water_and_boats(image)?;
        let mut boats = label_components(&boat_candidates(&segmentation));
        for filter in &self.filters {
            boats = filter.filter(&boats)?;
        }
        Ok(boats)
    }

    /// Segment boats and vectorize them in the image's world coordinates.
    pub fn detect(&self, image: &MultiBandImage) -> Result<BoatDetection> {
        let boats = self.segment_boats(image)?;
        let polygons = labels_to_polygons(&boats, image.transform(), 0)?;
        let detection = BoatDetection { boats, polygons };

        let (width, height) = image.dimensions();
        info!(
            boats = detection.boat_count(),
            width,
            height,
            gsd = image.ground_sample_distance(),
            "boat detection finished"
        );
        Ok(detection)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "BoatPipeline: index {}, minimum feature {} m2, {} region filters",
            self.index.name(),
            self.min_feature_size_m2,
            self.filters.len()
        )
    }
}

impl Default for BoatPipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Land / water / boat-candidate raster with default settings apart from
/// the minimum feature size.
pub fn segment_land_water_and_boats(
    image: &MultiBandImage,
    min_feature_size_m2: f64,
) -> Result<LabelRaster> {
    BoatPipeline::builder()
        .min_feature_size_m2(min_feature_size_m2)
        .build()
        .segment_land_water_and_boats(image)
}

/// Boat label raster with default settings.
pub fn segment_boats(image: &MultiBandImage) -> Result<LabelRaster> {
    BoatPipeline::default().segment_boats(image)
}
