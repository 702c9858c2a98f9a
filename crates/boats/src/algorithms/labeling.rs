//! Connected-component labelling of boat candidates and the solidity
//! filter that separates compact hulls from shoreline slivers.

use std::collections::{BTreeMap, BTreeSet};

use geo::{ConvexHull, Intersects};
use geo_types::{MultiPoint, Point};
use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::{
    error::{BoatError, Result},
    traits::RegionFilter,
    types::{BinaryMask, LabelRaster, RegionProperties},
};

/// Label 8-connected water components, numbered in raster-scan order from 1.
pub fn label_components(mask: &BinaryMask) -> LabelRaster {
    connected_components(mask, Connectivity::Eight, Luma([0u8]))
}

#[derive(Debug, Default)]
struct RegionAccumulator {
    area: usize,
    row_sum: f64,
    col_sum: f64,
    bbox: Option<(u32, u32, u32, u32)>,
    /// Leftmost and rightmost column per row
    row_extents: BTreeMap<u32, (u32, u32)>,
}

impl RegionAccumulator {
    fn push(&mut self, col: u32, row: u32) {
        self.area += 1;
        self.row_sum += row as f64;
        self.col_sum += col as f64;
        self.bbox = Some(match self.bbox {
            None => (row, col, row, col),
            Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
        });
        self.row_extents
            .entry(row)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(col);
                *hi = (*hi).max(col);
            })
            .or_insert((col, col));
    }

    /// Number of pixels whose centres lie inside or on the convex hull of
    /// all pixel corners.
    ///
    /// Per row only the outermost corners can be hull vertices.
    fn convex_area(&self) -> f64 {
        let Some((min_row, min_col, max_row, max_col)) = self.bbox else {
            return 0.0;
        };

        let mut corners = Vec::with_capacity(self.row_extents.len() * 4);
        for (&row, &(lo, hi)) in &self.row_extents {
            let (top, bottom) = (row as f64, row as f64 + 1.0);
            let (left, right) = (lo as f64, hi as f64 + 1.0);
            corners.push(Point::new(left, top));
            corners.push(Point::new(left, bottom));
            corners.push(Point::new(right, top));
            corners.push(Point::new(right, bottom));
        }
        let hull = MultiPoint::new(corners).convex_hull();

        let mut covered = 0usize;
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let centre = Point::new(col as f64 + 0.5, row as f64 + 0.5);
                if hull.intersects(&centre) {
                    covered += 1;
                }
            }
        }
        covered as f64
    }

    fn finish(self, label: u32) -> RegionProperties {
        let convex_area = self.convex_area();
        let n = self.area as f64;
        RegionProperties {
            label,
            area: self.area,
            convex_area,
            solidity: if convex_area > 0.0 { n / convex_area } else { 0.0 },
            bbox: self.bbox.unwrap_or_default(),
            centroid: (self.row_sum / n, self.col_sum / n),
        }
    }
}

/// Measure every non-zero label, ordered by label value.
pub fn region_properties(labels: &LabelRaster) -> Vec<RegionProperties> {
    let mut regions: BTreeMap<u32, RegionAccumulator> = BTreeMap::new();
    for (x, y, p) in labels.enumerate_pixels() {
        if p[0] != 0 {
            regions.entry(p[0]).or_default().push(x, y);
        }
    }

    regions
        .into_iter()
        .map(|(label, acc)| acc.finish(label))
        .collect()
}

/// Distinct label values present in a raster, excluding `ignore_label`.
pub fn distinct_labels(labels: &LabelRaster, ignore_label: u32) -> BTreeSet<u32> {
    labels
        .pixels()
        .map(|p| p[0])
        .filter(|&v| v != ignore_label)
        .collect()
}

/// Keeps regions whose solidity is strictly above `threshold`.
#[derive(Debug, Clone)]
pub struct SolidityFilter {
    pub threshold: f64,
}

impl SolidityFilter {
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(BoatError::InvalidParameter(format!(
                "solidity threshold must lie in [0, 1], got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }
}

impl Default for SolidityFilter {
    fn default() -> Self {
        Self { threshold: 0.9 }
    }
}

impl RegionFilter for SolidityFilter {
    fn filter(&self, labels: &LabelRaster) -> Result<LabelRaster> {
        let properties = region_properties(labels);
        let rejected: BTreeSet<u32> = properties
            .iter()
            .filter(|region| region.solidity <= self.threshold)
            .map(|region| region.label)
            .collect();

        debug!(
            regions = properties.len(),
            rejected = rejected.len(),
            threshold = self.threshold,
            "solidity filter"
        );

        let mut kept = labels.clone();
        if rejected.is_empty() {
            return Ok(kept);
        }
        for p in kept.pixels_mut() {
            if rejected.contains(&p[0]) {
                p[0] = 0;
            }
        }
        Ok(kept)
    }
}

/// Zero every region whose solidity is not above `solidity_threshold`.
pub fn filter_boats(labels: &LabelRaster, solidity_threshold: f64) -> Result<LabelRaster> {
    SolidityFilter::new(solidity_threshold)?.filter(labels)
}

/// Label candidate pixels and keep only the compact regions.
pub fn clean_boats(candidates: &BinaryMask, solidity_threshold: f64) -> Result<LabelRaster> {
    filter_boats(&label_components(candidates), solidity_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(rows: &[&[u32]]) -> LabelRaster {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        LabelRaster::from_fn(width, height, |x, y| Luma([rows[y as usize][x as usize]]))
    }

    fn mask(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        BinaryMask::from_fn(width, height, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_label_components_eight_connected() {
        let labels = label_components(&mask(&["#...#", ".#..#", "....."]));
        // Diagonal pair is one region, numbered first in scan order
        assert_eq!(labels.get_pixel(0, 0)[0], 1);
        assert_eq!(labels.get_pixel(1, 1)[0], 1);
        assert_eq!(labels.get_pixel(4, 0)[0], 2);
        assert_eq!(labels.get_pixel(4, 1)[0], 2);
        assert_eq!(distinct_labels(&labels, 0).len(), 2);
    }

    #[test]
    fn test_region_properties() {
        let labels = raster(&[
            &[1, 1, 0, 0], //
            &[1, 1, 0, 2], //
            &[0, 0, 2, 2], //
        ]);
        let props = region_properties(&labels);
        assert_eq!(props.len(), 2);

        let square = &props[0];
        assert_eq!(square.label, 1);
        assert_eq!(square.area, 4);
        assert_eq!(square.bbox, (0, 0, 1, 1));
        assert_eq!(square.centroid, (0.5, 0.5));
        assert!((square.convex_area - 4.0).abs() < 1e-9);
        assert!((square.solidity - 1.0).abs() < 1e-9);

        // L-tromino: the missing pixel's centre sits on the hull edge
        let tromino = &props[1];
        assert_eq!(tromino.label, 2);
        assert_eq!(tromino.area, 3);
        assert_eq!(tromino.bbox, (1, 2, 2, 3));
        assert!((tromino.convex_area - 4.0).abs() < 1e-9);
        assert!((tromino.solidity - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_line_solidity() {
        let labels = raster(&[&[1, 0, 0], &[0, 1, 0], &[0, 0, 1]]);
        let props = region_properties(&labels);
        // Diagonal plus the four pixels the hull edges pass through
        assert!((props[0].convex_area - 7.0).abs() < 1e-9);
        assert!((props[0].solidity - 3.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_clipped_corner_block_is_rejected() {
        let labels = raster(&[&[1, 1, 0], &[1, 1, 1], &[1, 1, 1]]);
        let props = region_properties(&labels);
        assert_eq!(props[0].area, 8);
        assert!((props[0].convex_area - 9.0).abs() < 1e-9);
        assert!((props[0].solidity - 8.0 / 9.0).abs() < 1e-9);

        let filtered = filter_boats(&labels, 0.9).unwrap();
        assert!(filtered.pixels().all(|p| p[0] == 0));
        let kept = filter_boats(&labels, 0.85).unwrap();
        assert_eq!(kept, labels);
    }

    #[test]
    fn test_single_pixel_is_solid() {
        let props = region_properties(&raster(&[&[0, 0], &[0, 7]]));
        assert_eq!(props[0].label, 7);
        assert!((props[0].solidity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_solidity_filter_keeps_labels() {
        let labels = raster(&[
            &[1, 1, 0, 3, 3, 3, 0], //
            &[1, 1, 0, 3, 3, 3, 3], //
            &[0, 0, 0, 3, 3, 3, 3], //
            &[2, 0, 0, 3, 3, 3, 3], //
            &[2, 2, 0, 0, 0, 0, 0], //
        ]);
        let filtered = SolidityFilter::default().filter(&labels).unwrap();

        // Square and the clipped 4x4 block (15 of 16) survive with their ids
        assert_eq!(filtered.get_pixel(0, 0)[0], 1);
        assert_eq!(filtered.get_pixel(4, 2)[0], 3);
        // L-tromino is removed
        assert_eq!(filtered.get_pixel(0, 3)[0], 0);
        assert_eq!(filtered.get_pixel(1, 4)[0], 0);

        let before = distinct_labels(&labels, 0);
        let after = distinct_labels(&filtered, 0);
        assert!(after.is_subset(&before));
        assert_eq!(after.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_filter_threshold_is_strict() {
        // Solidity of exactly 1 is not above a threshold of 1
        let labels = raster(&[&[1, 1], &[1, 1]]);
        let filtered = SolidityFilter::new(1.0).unwrap().filter(&labels).unwrap();
        assert!(filtered.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_empty_raster() {
        let labels = LabelRaster::new(0, 0);
        assert!(region_properties(&labels).is_empty());
        let filtered = SolidityFilter::default().filter(&labels).unwrap();
        assert_eq!(filtered.dimensions(), (0, 0));

        let cleaned = clean_boats(&BinaryMask::new(5, 4), 0.9).unwrap();
        assert!(cleaned.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            SolidityFilter::new(1.5),
            Err(BoatError::InvalidParameter(_))
        ));
        assert!(SolidityFilter::new(f64::NAN).is_err());
    }
}
