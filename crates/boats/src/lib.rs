//! # Boat Segmentation Library
//!
//! Finds vessels in multispectral satellite imagery and turns them into
//! georeferenced polygons.
//!
//! ## Core Features
//!
//! - **Water Index**: Normalized difference of two bands, NIR against coastal by default
//! - **Automatic Thresholding**: Gaussian smoothing followed by Otsu's method
//! - **Morphological Cleaning**: Area thresholds in square meters, converted with the ground sample distance
//! - **Solidity Filtering**: Compact blobs are kept, slivers and wakes are dropped
//! - **Vectorization**: Label regions become valid polygons in world coordinates
//! - **GeoJSON Support**: Export/import as a CRS84 `FeatureCollection`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boats::{GeoTransform, ImageMetadata, MultiBandImage, labels_to_polygons, segment_boats, to_geojson};
//!
//! let (width, height) = (64, 64);
//! let bands = vec![vec![0.2f32; (width * height) as usize]; 8];
//! let transform = GeoTransform::north_up(500_000.0, 4_000_000.0, 2.0);
//! let image = MultiBandImage::from_band_data(width, height, bands, transform, ImageMetadata::new(2.0)?)?;
//!
//! let boats = segment_boats(&image)?;
//! let polygons = labels_to_polygons(&boats, image.transform(), 0)?;
//! let geojson = to_geojson(&polygons)?;
//! # Ok::<(), boats::BoatError>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use boats::{BoatPipeline, algorithms::*};
//!
//! let pipeline = BoatPipeline::builder()
//!     .set_index_calculator(WaterIndex::new(6, 1))
//!     .set_thresholder(GaussianOtsuThresholder { sigma: 2.0, truncate: 4.0, bins: 128 })
//!     .min_feature_size_m2(100_000.0)
//!     .with_solidity_filter(0.85)?
//!     .build();
//! # Ok::<(), boats::BoatError>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use algorithms::{
    GaussianOtsuThresholder, MorphologicalCleaner, SolidityFilter, WaterIndex, clean_boats,
    filter_boats, labels_to_polygons, m2_to_cells, region_properties,
};
pub use config::{SegmentationConfig, WaterIndexConfig};
pub use error::{BoatError, Result};
pub use io::{from_geojson, to_geojson};
pub use pipeline::{
    BoatPipeline, builder::PipelineBuilder, segment_boats, segment_land_water_and_boats,
};
pub use traits::*;
pub use types::*;
