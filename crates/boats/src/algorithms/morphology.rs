//! Hole filling and small-object removal on water masks, and the
//! land / water / boat-candidate classification built from them.

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::types::{BinaryMask, ClassCounts, LabelRaster, SegmentClass, WATER, is_water};

/// Pixel count and border contact of every labelled component.
///
/// Index 0 is the background and is never meaningful.
#[derive(Debug, Clone)]
struct ComponentStats {
    sizes: Vec<usize>,
    touches_border: Vec<bool>,
}

fn component_stats(labels: &LabelRaster) -> ComponentStats {
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut sizes = vec![0usize; max_label + 1];
    let mut touches_border = vec![false; max_label + 1];
    let (width, height) = labels.dimensions();

    for (x, y, p) in labels.enumerate_pixels() {
        let label = p[0] as usize;
        if label == 0 {
            continue;
        }
        sizes[label] += 1;
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            touches_border[label] = true;
        }
    }

    ComponentStats {
        sizes,
        touches_border,
    }
}

fn invert(mask: &BinaryMask) -> BinaryMask {
    BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if is_water(mask.get_pixel(x, y)) { 0 } else { WATER }])
    })
}

/// Fill enclosed non-water regions smaller than `min_size` pixels.
///
/// Holes are 4-connected non-water components that do not reach the image
/// border; filled holes become water.
pub fn remove_small_holes(mask: &BinaryMask, min_size: u64) -> BinaryMask {
    let mut filled = mask.clone();
    if mask.width() == 0 || mask.height() == 0 || min_size == 0 {
        return filled;
    }

    let background = invert(mask);
    let holes = connected_components(&background, Connectivity::Four, Luma([0u8]));
    let stats = component_stats(&holes);

    let mut count = 0usize;
    for (x, y, p) in holes.enumerate_pixels() {
        let label = p[0] as usize;
        if label != 0 && !stats.touches_border[label] && (stats.sizes[label] as u64) < min_size {
            filled.put_pixel(x, y, Luma([WATER]));
            count += 1;
        }
    }

    debug!(filled_pixels = count, min_size, "removed small holes");
    filled
}

/// Drop 8-connected water components smaller than `min_size` pixels.
pub fn remove_small_objects(mask: &BinaryMask, min_size: u64) -> BinaryMask {
    let mut cleaned = mask.clone();
    if mask.width() == 0 || mask.height() == 0 || min_size == 0 {
        return cleaned;
    }

    let objects = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let stats = component_stats(&objects);

    let mut count = 0usize;
    for (x, y, p) in objects.enumerate_pixels() {
        let label = p[0] as usize;
        if label != 0 && (stats.sizes[label] as u64) < min_size {
            cleaned.put_pixel(x, y, Luma([0]));
            count += 1;
        }
    }

    debug!(removed_pixels = count, min_size, "removed small objects");
    cleaned
}

/// Classify a water mask into land (0), confirmed water (1) and boat
/// candidates (2).
///
/// Boat candidates are water pixels, after hole filling, that belong to a
/// water body too small to survive small-object removal.
#[derive(Debug, Clone)]
pub struct MorphologicalCleaner {
    /// Minimum size of a real water body or land hole, in pixels
    pub min_feature_size: u64,
}

impl MorphologicalCleaner {
    pub fn new(min_feature_size: u64) -> Self {
        Self { min_feature_size }
    }

    pub fn clean(&self, mask: &BinaryMask) -> LabelRaster {
        let no_holes = remove_small_holes(mask, self.min_feature_size);
        let water_only = remove_small_objects(&no_holes, self.min_feature_size);

        LabelRaster::from_fn(mask.width(), mask.height(), |x, y| {
            let water = is_water(water_only.get_pixel(x, y));
            let candidate = is_water(no_holes.get_pixel(x, y)) && !water;
            let class = if candidate {
                SegmentClass::BoatCandidate
            } else if water {
                SegmentClass::Water
            } else {
                SegmentClass::Land
            };
            Luma([class.value()])
        })
    }
}

/// Mask of the pixels classified as boat candidates.
pub fn boat_candidates(segmentation: &LabelRaster) -> BinaryMask {
    BinaryMask::from_fn(segmentation.width(), segmentation.height(), |x, y| {
        let candidate = segmentation.get_pixel(x, y)[0] == SegmentClass::BoatCandidate.value();
        Luma([if candidate { WATER } else { 0 }])
    })
}

/// Tally the classes of a segmentation raster. Values outside the three
/// classes are ignored.
pub fn class_counts(segmentation: &LabelRaster) -> ClassCounts {
    let mut counts = ClassCounts::default();
    for p in segmentation.pixels() {
        match SegmentClass::from_value(p[0]) {
            Some(SegmentClass::Land) => counts.land += 1,
            Some(SegmentClass::Water) => counts.water += 1,
            Some(SegmentClass::BoatCandidate) => counts.boat_candidate += 1,
            None => {}
        }
    }
    counts
}
