//! # Motionflow - Optical Flow from Rigid Motion
//!
//! Synthesizes dense optical flow from a depth map, per-instance rigid motions
//! and a camera motion, and evaluates synthesized flow against a reference.
//!
//! ## Features
//!
//! - Pinhole back-projection and re-projection
//! - Rigid motions with an optional rotation pivot
//! - Deterministic instance ownership when masks overlap
//! - Flow color-wheel visualization
//! - End-point error, KITTI outlier ratio and error images
//!
//! ## Conventions
//!
//! Grids are `nalgebra::DMatrix` values indexed `(row, col)` with the origin
//! at the top-left pixel. Flow is stored as two named channels, `dy` (row
//! displacement) and `dx` (column displacement).
//!
//! ## Example
//!
//! ```rust,ignore
//! use motionflow::{dense_flow_from_motion, average_endpoint_error, CameraIntrinsics,
//!     CompositorConfig, DepthMap, RigidMotion, ValidityMask};
//!
//! let depth = DepthMap::constant(4, 4, 10.0);
//! let intrinsics = CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0)?;
//! let camera = RigidMotion::from_translation(1.0, 0.0, 0.0);
//!
//! let flow = dense_flow_from_motion(&depth, &[], &[], &camera, &intrinsics,
//!     &CompositorConfig::default())?;
//! let validity = ValidityMask::all_valid(4, 4);
//! assert_eq!(average_endpoint_error(&flow, &flow, &validity)?, 0.0);
//! ```

pub mod geometry;
pub mod depth;
pub mod mask;
pub mod flow_field;
pub mod image;
pub mod compositor;
pub mod flow_color;
pub mod metrics;

#[cfg(feature = "python")]
pub mod python;

// Re-exports for convenience
pub use geometry::{CameraIntrinsics, RigidMotion};
pub use depth::DepthMap;
pub use mask::{InstanceMask, ValidityMask};
pub use flow_field::{ChannelOrder, FlowField};
pub use image::RgbImage;
pub use compositor::{
    dense_flow_from_motion, ownership_grid, CompositionReport, Compositor, CompositorConfig,
    OwnershipPolicy,
};
pub use flow_color::{flow_to_color, ColorScale};
pub use metrics::{
    average_endpoint_error, error_image, error_image_with_occlusion, error_magnitude,
    outlier_ratio, ErrorImageStyle, EvaluatorConfig, FlowEvaluation, FlowEvaluator,
    OutlierThresholds, EMPTY_VALIDITY_EPE,
};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the motionflow library.
    ///
    /// Only precondition violations are reported as errors. Numeric
    /// degeneracies (invalid depth, points behind the camera, empty validity
    /// masks) are absorbed by value.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum Error {
        #[error("Shape mismatch for {what}: expected {expected:?}, got {got:?}")]
        ShapeMismatch {
            what: String,
            expected: (usize, usize),
            got: (usize, usize),
        },

        #[error("Instance count mismatch: {masks} masks but {motions} motions")]
        InstanceCountMismatch { masks: usize, motions: usize },

        #[error("Invalid camera intrinsics: {0}")]
        InvalidIntrinsics(String),

        #[error("Invalid rigid motion: {0}")]
        InvalidMotion(String),

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid buffer length: expected {expected}, got {got}")]
        InvalidBuffer { expected: usize, got: usize },
    }

    impl Error {
        /// Build a `ShapeMismatch` from two `(rows, cols)` shapes.
        pub(crate) fn shape(what: &str, expected: (usize, usize), got: (usize, usize)) -> Self {
            Error::ShapeMismatch {
                what: what.to_string(),
                expected,
                got,
            }
        }
    }

    /// Result type for motionflow operations
    pub type Result<T> = std::result::Result<T, Error>;
}
