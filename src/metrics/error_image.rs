//! Error visualizations.

use serde::{Deserialize, Serialize};

use super::check_shapes;
use super::endpoint_error::endpoint_distance;
use crate::flow_field::FlowField;
use crate::image::RgbImage;
use crate::mask::ValidityMask;
use crate::{Error, Result};

/// Errors at or above this many pixels are full intensity in `Linear` images.
const LINEAR_ERROR_CAP: f64 = 5.0;

/// KITTI devkit error colormap: `[lower, upper)` bounds and an RGB color.
const LOG_COLORMAP: [(f64, f64, [u8; 3]); 10] = [
    (0.0, 0.0625, [49, 54, 149]),
    (0.0625, 0.125, [69, 117, 180]),
    (0.125, 0.25, [116, 173, 209]),
    (0.25, 0.5, [171, 217, 233]),
    (0.5, 1.0, [224, 243, 248]),
    (1.0, 2.0, [254, 224, 144]),
    (2.0, 4.0, [253, 174, 97]),
    (4.0, 8.0, [244, 109, 67]),
    (8.0, 16.0, [215, 48, 39]),
    (16.0, 1e9, [165, 0, 38]),
];

/// Rendering of per-pixel end-point error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorImageStyle {
    /// Unnormalized error magnitude in all three channels.
    Raw,
    /// `min(error, 5) / 5` as `(e, e, e)`; occluded pixels keep only red.
    #[default]
    Linear,
    /// KITTI log colormap over the error relative to the reference magnitude;
    /// occluded pixels at half intensity.
    LogColors,
}

fn log_color(error: f64, reference_magnitude: f64) -> [f64; 3] {
    let scaled = if reference_magnitude > 0.0 {
        (error / 3.0).min(20.0 * error / reference_magnitude)
    } else {
        error / 3.0
    };
    LOG_COLORMAP
        .iter()
        .find(|(lower, upper, _)| scaled >= *lower && scaled < *upper)
        .map(|(_, _, rgb)| rgb.map(|v| v as f64 / 255.0))
        .unwrap_or([0.0; 3])
}

/// Visualize the end-point error between two flows.
///
/// Invalid pixels, and pixels where either vector is not finite, are black.
/// Every valid pixel counts as non-occluded.
pub fn error_image(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
    style: ErrorImageStyle,
) -> Result<RgbImage> {
    let (height, width) = validity.shape();
    error_image_with_occlusion(
        predicted,
        reference,
        validity,
        &ValidityMask::all_valid(height, width),
        style,
    )
}

/// Visualize the end-point error, distinguishing non-occluded pixels.
///
/// `validity` marks pixels with reference flow (occluded or not),
/// `non_occluded` the subset visible in both frames.
pub fn error_image_with_occlusion(
    predicted: &FlowField,
    reference: &FlowField,
    validity: &ValidityMask,
    non_occluded: &ValidityMask,
    style: ErrorImageStyle,
) -> Result<RgbImage> {
    let (height, width) = check_shapes(predicted, reference, validity)?;
    if non_occluded.shape() != (height, width) {
        return Err(Error::shape(
            "non-occluded mask",
            (height, width),
            non_occluded.shape(),
        ));
    }

    Ok(RgbImage::from_fn(height, width, |r, c| {
        if !validity.is_valid(r, c) {
            return [0.0; 3];
        }
        let Some(error) = endpoint_distance(predicted, reference, r, c) else {
            return [0.0; 3];
        };
        let (ry, rx) = reference.get(r, c);
        let visible = non_occluded.is_valid(r, c);

        match style {
            ErrorImageStyle::Raw => [error; 3],
            ErrorImageStyle::Linear => {
                let e = error.min(LINEAR_ERROR_CAP) / LINEAR_ERROR_CAP;
                if visible {
                    [e, e, e]
                } else {
                    [e, 0.0, 0.0]
                }
            }
            ErrorImageStyle::LogColors => {
                let rgb = log_color(error, ry.hypot(rx));
                if visible {
                    rgb
                } else {
                    rgb.map(|v| v * 0.5)
                }
            }
        }
    }))
}
