use crate::{
    algorithms::{GaussianOtsuThresholder, SolidityFilter, WaterIndex},
    error::Result,
    pipeline::{BoatPipeline, DEFAULT_MIN_FEATURE_SIZE_M2},
    traits::{IndexCalculator, RegionFilter, Thresholder},
};

/// Builder for creating segmentation pipelines with a fluent API
pub struct PipelineBuilder {
    index: Option<Box<dyn IndexCalculator>>,
    thresholder: Option<Box<dyn Thresholder>>,
    min_feature_size_m2: f64,
    filters: Vec<Box<dyn RegionFilter>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            index: None,
            thresholder: None,
            min_feature_size_m2: DEFAULT_MIN_FEATURE_SIZE_M2,
            filters: Vec::new(),
        }
    }

    /// Set the spectral index (replaces any existing one)
    pub fn set_index_calculator<I>(mut self, index: I) -> Self
    where
        I: IndexCalculator + 'static,
    {
        self.index = Some(Box::new(index));
        self
    }

    /// Set the thresholder (replaces any existing one)
    pub fn set_thresholder<T>(mut self, thresholder: T) -> Self
    where
        T: Thresholder + 'static,
    {
        self.thresholder = Some(Box::new(thresholder));
        self
    }

    /// Minimum area of a real water body or land hole, in square meters
    pub fn min_feature_size_m2(mut self, area_m2: f64) -> Self {
        self.min_feature_size_m2 = area_m2;
        self
    }

    /// Add a region filter applied to the labelled boat candidates
    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: RegionFilter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Keep candidates whose solidity is strictly above `threshold`.
    ///
    /// Fails unless `threshold` lies in `[0, 1]`.
    pub fn with_solidity_filter(self, threshold: f64) -> Result<Self> {
        Ok(self.add_filter(SolidityFilter::new(threshold)?))
    }

    /// Build the pipeline with default components if not specified.
    ///
    /// Without any filter the default solidity filter is used.
    pub fn build(self) -> BoatPipeline {
        let index = self.index.unwrap_or_else(|| Box::new(WaterIndex::default()));
        let thresholder = self
            .thresholder
            .unwrap_or_else(|| Box::new(GaussianOtsuThresholder::default()));

        let mut filters = self.filters;
        if filters.is_empty() {
            filters.push(Box::new(SolidityFilter::default()));
        }

        BoatPipeline::new(index, thresholder, self.min_feature_size_m2, filters)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoatError;

    #[test]
    fn test_defaults() {
        let info = PipelineBuilder::new().build().info();
        assert!(info.contains("water_index"));
        assert!(info.contains("400000"));
        assert!(info.contains("1 region filters"));
    }

    #[test]
    fn test_custom_components() {
        let pipeline = BoatPipeline::builder()
            .set_index_calculator(WaterIndex::new(3, 1))
            .min_feature_size_m2(1_000.0)
            .with_solidity_filter(0.8)
            .unwrap()
            .with_solidity_filter(0.5)
            .unwrap()
            .build();
        let info = pipeline.info();
        assert!(info.contains("1000"));
        assert!(info.contains("2 region filters"));
    }

    #[test]
    fn test_solidity_filter_range_checked() {
        assert!(matches!(
            PipelineBuilder::new().with_solidity_filter(1.5),
            Err(BoatError::InvalidParameter(_))
        ));
        assert!(PipelineBuilder::new().with_solidity_filter(f64::NAN).is_err());
        assert!(PipelineBuilder::new().with_solidity_filter(0.0).is_ok());
    }
}
