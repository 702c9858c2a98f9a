use crate::{
    error::{BoatError, Result},
    types::validate_gsd,
};

/// Number of pixels covering `area_m2` at the given ground sample distance.
///
/// Rounds half to even (`2.5 -> 2`, `3.5 -> 4`), the IEEE `roundeven` rule.
pub fn m2_to_cells(area_m2: f64, ground_sample_distance: f64) -> Result<u64> {
    validate_gsd(ground_sample_distance)?;
    if !area_m2.is_finite() || area_m2 < 0.0 {
        return Err(BoatError::InvalidParameter(format!(
            "area must be a non-negative number of square meters, got {area_m2}"
        )));
    }

    let cell_area = ground_sample_distance * ground_sample_distance;
    Ok((area_m2 / cell_area).round_ties_even() as u64)
}

/// Ground area covered by `cells` pixels.
pub fn cells_to_m2(cells: u64, ground_sample_distance: f64) -> Result<f64> {
    validate_gsd(ground_sample_distance)?;
    Ok(cells as f64 * ground_sample_distance * ground_sample_distance)
}
