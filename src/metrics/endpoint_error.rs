//! End-point error metrics.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::check_shapes;
use crate::flow_field::FlowField;
use crate::mask::ValidityMask;
use crate::Result;

/// EPE reported when no pixel is valid.
pub const EMPTY_VALIDITY_EPE: f64 = 0.0;

/// Thresholds of the KITTI outlier criterion.
///
/// A pixel is an outlier when its end-point error exceeds both `absolute`
/// pixels and `relative` times the reference flow magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierThresholds {
    pub absolute: f64,
    pub relative: f64,
}

impl Default for OutlierThresholds {
    fn default() -> Self {
        Self {
            absolute: 3.0,
            relative: 0.05,
        }
    }
}

/// Distance between the two vectors at `(row, col)`, or `None` when it is not
/// finite.
#[inline]
pub(super) fn endpoint_distance(
    predicted: &FlowField,
    reference: &FlowField,
    row: usize,
    col: usize,
) -> Option<f64> {
    let (py, px) = predicted.get(row, col);
    let (ry, rx) = reference.get(row, col);
    let distance = (py - ry).hypot(px - rx);
    distance.is_finite().then_some(distance)
}

/// Per-pixel Euclidean distance between predicted and reference vectors.
///
/// Invalid pixels, and pixels where either vector is not finite, are 0.
pub fn error_magnitude(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
) -> Result<DMatrix<f64>> {
    let (height, width) = check_shapes(predicted, reference, validity)?;
    Ok(DMatrix::from_fn(height, width, |r, c| {
        if validity.is_valid(r, c) {
            endpoint_distance(predicted, reference, r, c).unwrap_or(0.0)
        } else {
            0.0
        }
    }))
}

/// Mean end-point error over valid pixels.
///
/// Valid pixels where either vector is not finite are left out of the mean.
/// Returns [`EMPTY_VALIDITY_EPE`] when no pixel remains.
pub fn average_endpoint_error(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
) -> Result<f64> {
    let (height, width) = check_shapes(predicted, reference, validity)?;

    let mut total = 0.0;
    let mut count = 0usize;
    for c in 0..width {
        for r in 0..height {
            if !validity.is_valid(r, c) {
                continue;
            }
            if let Some(distance) = endpoint_distance(predicted, reference, r, c) {
                total += distance;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Ok(EMPTY_VALIDITY_EPE);
    }
    Ok(total / count as f64)
}

/// Fraction of valid pixels that are outliers under `thresholds`.
///
/// Pixels are counted as in [`average_endpoint_error`]. Returns 0 when no
/// pixel remains.
pub fn outlier_ratio(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
    thresholds: OutlierThresholds,
) -> Result<f64> {
    let (height, width) = check_shapes(predicted, reference, validity)?;

    let mut outliers = 0usize;
    let mut count = 0usize;
    for c in 0..width {
        for r in 0..height {
            if !validity.is_valid(r, c) {
                continue;
            }
            let Some(error) = endpoint_distance(predicted, reference, r, c) else {
                continue;
            };
            count += 1;
            let (ry, rx) = reference.get(r, c);
            if error > thresholds.absolute && error > thresholds.relative * ry.hypot(rx) {
                outliers += 1;
            }
        }
    }

    if count == 0 {
        return Ok(0.0);
    }
    Ok(outliers as f64 / count as f64)
}
