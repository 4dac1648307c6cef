//! Flow evaluation module.
//!
//! This module scores a predicted flow field against a reference, restricted
//! to pixels marked valid. It includes:
//!
//! - `error_magnitude` - Per-pixel end-point error
//! - `average_endpoint_error` - Mean end-point error (EPE)
//! - `outlier_ratio` - KITTI "Fl" outlier fraction
//! - `error_image` - Error visualizations
//! - `FlowEvaluator` - All of the above plus color maps in one pass

mod endpoint_error;
mod error_image;
mod evaluation;

pub use endpoint_error::{
    average_endpoint_error, error_magnitude, outlier_ratio, OutlierThresholds, EMPTY_VALIDITY_EPE,
};
pub use error_image::{error_image, error_image_with_occlusion, ErrorImageStyle};
pub use evaluation::{EvaluatorConfig, FlowEvaluation, FlowEvaluator};

use crate::flow_field::FlowField;
use crate::mask::ValidityMask;
use crate::Result;

/// Check that predicted, reference and validity share one shape.
fn check_shapes(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
) -> Result<(usize, usize)> {
    let shape = validity.shape();
    predicted.check_shape("predicted flow", shape)?;
    reference.check_shape("reference flow", shape)?;
    Ok(shape)
}
