use crate::{
    error::Result,
    types::{BinaryMask, IndexRaster, LabelRaster, MultiBandImage},
};

/// Trait for spectral index algorithms
pub trait IndexCalculator: Send + Sync {
    /// Compute one index value per pixel of the image
    fn calculate(&self, image: &MultiBandImage) -> Result<IndexRaster>;

    /// Short human-readable name, used in logs
    fn name(&self) -> &str;
}

/// Outcome of binarizing an index raster.
#[derive(Debug, Clone)]
pub struct Binarized {
    pub mask: BinaryMask,
    pub threshold: f64,
    /// True when the smoothed index held a single value, so no class split exists
    pub uniform: bool,
}

/// Trait for algorithms turning an index raster into a water mask
pub trait Thresholder: Send + Sync {
    fn binarize(&self, index: &IndexRaster) -> Result<Binarized>;
}

/// Trait for filters over labelled candidate regions
pub trait RegionFilter: Send + Sync {
    /// Return a raster holding only the accepted regions, labels unchanged
    fn filter(&self, labels: &LabelRaster) -> Result<LabelRaster>;
}
