//! Index smoothing and automatic water/non-water thresholding.
//!
//! Stage order is fixed: non-finite scores are replaced by 0, the raster is
//! smoothed with a separable Gaussian (values kept in their original range),
//! a global threshold is picked with Otsu's method, and every pixel at or
//! above the threshold becomes water.

use imageproc::filter::separable_filter_equal;
use tracing::{debug, warn};

use crate::{
    error::{BoatError, Result},
    traits::{Binarized, Thresholder},
    types::{BinaryMask, IndexRaster, WATER},
};

/// Replace `NaN` and infinite scores with 0. Returns the count replaced.
pub fn scrub_non_finite(index: &IndexRaster) -> (IndexRaster, usize) {
    let mut scrubbed = index.clone();
    let mut replaced = 0;
    for p in scrubbed.pixels_mut() {
        if !p[0].is_finite() {
            p[0] = 0.0;
            replaced += 1;
        }
    }
    (scrubbed, replaced)
}

/// Normalized 1-D Gaussian weights, radius `floor(truncate * sigma + 0.5)`.
fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable Gaussian blur with border pixels replicated outward.
///
/// Negative scores pass through unclamped.
///
/// `sigma == 0` returns the input unchanged.
pub fn gaussian_smooth(index: &IndexRaster, sigma: f64, truncate: f64) -> Result<IndexRaster> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(BoatError::InvalidParameter(format!(
            "gaussian sigma must be a non-negative number, got {sigma}"
        )));
    }
    if !truncate.is_finite() || truncate <= 0.0 {
        return Err(BoatError::InvalidParameter(format!(
            "gaussian truncate must be positive, got {truncate}"
        )));
    }
    if sigma == 0.0 || index.width() == 0 || index.height() == 0 {
        return Ok(index.clone());
    }

    let kernel: Vec<f32> = gaussian_kernel(sigma, truncate)
        .into_iter()
        .map(|w| w as f32)
        .collect();
    Ok(separable_filter_equal(index, &kernel))
}

/// Global threshold chosen by Otsu's method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuThreshold {
    pub value: f64,
    /// All samples were equal; `value` is that constant
    pub uniform: bool,
}

/// Otsu threshold over a histogram of `bins` equal-width bins spanning the
/// sample range.
///
/// Candidate thresholds are bin centres; the first centre maximizing the
/// between-class variance wins. Non-finite samples are ignored.
pub fn otsu_threshold(values: &[f32], bins: usize) -> Result<OtsuThreshold> {
    if bins < 2 {
        return Err(BoatError::InvalidParameter(format!(
            "otsu needs at least 2 histogram bins, got {bins}"
        )));
    }

    let finite = values.iter().filter(|v| v.is_finite()).map(|&v| v as f64);
    let (min, max) = finite.clone().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if min > max {
        // No finite samples at all
        return Ok(OtsuThreshold {
            value: 0.0,
            uniform: true,
        });
    }
    if min == max {
        return Ok(OtsuThreshold {
            value: min,
            uniform: true,
        });
    }

    let span = max - min;
    let mut histogram = vec![0.0f64; bins];
    for v in finite {
        let bin = (((v - min) / span) * bins as f64) as usize;
        histogram[bin.min(bins - 1)] += 1.0;
    }
    let centers: Vec<f64> = (0..bins)
        .map(|i| min + span * (i as f64 + 0.5) / bins as f64)
        .collect();

    // Suffix sums give the upper class for each split
    let mut upper_weight = vec![0.0; bins + 1];
    let mut upper_sum = vec![0.0; bins + 1];
    for i in (0..bins).rev() {
        upper_weight[i] = upper_weight[i + 1] + histogram[i];
        upper_sum[i] = upper_sum[i + 1] + histogram[i] * centers[i];
    }

    let mut lower_weight = 0.0;
    let mut lower_sum = 0.0;
    let mut best_variance = f64::NEG_INFINITY;
    let mut best = 0;
    for i in 0..bins - 1 {
        lower_weight += histogram[i];
        lower_sum += histogram[i] * centers[i];

        let w_hi = upper_weight[i + 1];
        if lower_weight == 0.0 || w_hi == 0.0 {
            continue;
        }
        let mean_lo = lower_sum / lower_weight;
        let mean_hi = upper_sum[i + 1] / w_hi;
        let variance = lower_weight * w_hi * (mean_lo - mean_hi).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = i;
        }
    }

    Ok(OtsuThreshold {
        value: centers[best],
        uniform: false,
    })
}

/// Mark every pixel whose value is at or above `threshold` as water.
pub fn binarize(index: &IndexRaster, threshold: f64) -> BinaryMask {
    BinaryMask::from_fn(index.width(), index.height(), |x, y| {
        let v = index.get_pixel(x, y)[0] as f64;
        image::Luma([if v >= threshold { WATER } else { 0 }])
    })
}

/// Gaussian smoothing followed by Otsu binarization.
#[derive(Debug, Clone)]
pub struct GaussianOtsuThresholder {
    pub sigma: f64,
    pub truncate: f64,
    pub bins: usize,
}

impl Default for GaussianOtsuThresholder {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            truncate: 4.0,
            bins: 256,
        }
    }
}

impl Thresholder for GaussianOtsuThresholder {
    fn binarize(&self, index: &IndexRaster) -> Result<Binarized> {
        let (scrubbed, replaced) = scrub_non_finite(index);
        if replaced > 0 {
            warn!(replaced, "replaced non-finite index values with 0");
        }

        let smoothed = gaussian_smooth(&scrubbed, self.sigma, self.truncate)?;
        let otsu = otsu_threshold(smoothed.as_raw(), self.bins)?;
        if otsu.uniform {
            warn!(value = otsu.value, "index is uniform, treating every pixel as water");
        }

        let mask = binarize(&smoothed, otsu.value);
        debug!(
            threshold = otsu.value,
            water_pixels = mask.pixels().filter(|p| p[0] != 0).count(),
            "binarized index"
        );

        Ok(Binarized {
            mask,
            threshold: otsu.value,
            uniform: otsu.uniform,
        })
    }
}

/// Binarize with the default smoothing and histogram settings.
pub fn binary_threshold(index: &IndexRaster) -> Result<Binarized> {
    GaussianOtsuThresholder::default().binarize(index)
}
