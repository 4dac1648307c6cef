//! Flow evaluation in one pass.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{
    average_endpoint_error, check_shapes, error_image, outlier_ratio, ErrorImageStyle,
    OutlierThresholds,
};
use crate::flow_color::{render, ColorScale};
use crate::flow_field::FlowField;
use crate::image::RgbImage;
use crate::mask::ValidityMask;
use crate::{Error, Result};

/// Configuration for [`FlowEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Normalization of the flow color maps.
    pub color_scale: ColorScale,
    /// Rendering of the error image.
    pub error_style: ErrorImageStyle,
    /// KITTI outlier thresholds.
    pub outliers: OutlierThresholds,
}

impl EvaluatorConfig {
    /// Check the configuration for invalid values.
    pub fn validate(&self) -> Result<()> {
        if let ColorScale::Fixed(max_flow) = self.color_scale {
            if !max_flow.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "fixed color scale must be finite, got {}",
                    max_flow
                )));
            }
        }
        let OutlierThresholds { absolute, relative } = self.outliers;
        if !(absolute >= 0.0 && relative >= 0.0) || !absolute.is_finite() || !relative.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "outlier thresholds must be finite and non-negative, got ({}, {})",
                absolute, relative
            )));
        }
        Ok(())
    }
}

/// Result of evaluating a predicted flow against a reference.
#[derive(Debug, Clone)]
pub struct FlowEvaluation {
    /// Color map of the predicted flow (valid pixels only).
    pub predicted_color: RgbImage,
    /// Color map of the reference flow (valid pixels only).
    pub reference_color: RgbImage,
    /// Per-pixel error visualization.
    pub error_image: RgbImage,
    /// Average end-point error over valid pixels.
    pub average_epe: f64,
    /// Fraction of valid pixels that are KITTI outliers.
    pub outlier_ratio: f64,
    /// Number of valid pixels.
    pub num_valid: usize,
}

/// Scores predicted flow against reference flow.
#[derive(Debug, Clone, Default)]
pub struct FlowEvaluator {
    config: EvaluatorConfig,
}

impl FlowEvaluator {
    /// Create an evaluator, validating its configuration.
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate `predicted` against `reference` over `validity`.
    ///
    /// Both color maps share the reference's normalization under
    /// `ColorScale::PerFieldMax`, so colors are comparable.
    pub fn evaluate(
        &self,
        predicted: &FlowField,
        reference: &FlowField,
        validity: &ValidityMask,
    ) -> Result<FlowEvaluation> {
        check_shapes(predicted, reference, validity)?;

        let num_valid = validity.num_valid();
        if num_valid == 0 {
            warn!("Evaluating flow with an empty validity mask");
        }

        let max_flow = self.config.color_scale.max_flow(reference, Some(validity));
        let reference_color = render(reference, Some(validity), max_flow);
        let predicted_color = render(predicted, Some(validity), max_flow);
        let error_image = error_image(predicted, reference, validity, self.config.error_style)?;
        let average_epe = average_endpoint_error(predicted, reference, validity)?;
        let outlier_ratio = outlier_ratio(predicted, reference, validity, self.config.outliers)?;

        debug!(
            "Flow evaluation: EPE {:.4}, outliers {:.2}% over {} valid pixels",
            average_epe,
            outlier_ratio * 100.0,
            num_valid
        );

        Ok(FlowEvaluation {
            predicted_color,
            reference_color,
            error_image,
            average_epe,
            outlier_ratio,
            num_valid,
        })
    }
}
