//! Pinhole camera intrinsics.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pinhole camera intrinsics.
///
/// Pixel coordinates are `(u, v)` = `(col, row)` with the origin at the center
/// of the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in pixels (x-axis, columns).
    pub fx: f64,
    /// Focal length in pixels (y-axis, rows).
    pub fy: f64,
    /// Principal point x (pixels).
    pub cx: f64,
    /// Principal point y (pixels).
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Construct from explicit parameters.
    ///
    /// Focal lengths must be finite and non-zero, the principal point finite.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self> {
        if !fx.is_finite() || !fy.is_finite() || fx == 0.0 || fy == 0.0 {
            return Err(Error::InvalidIntrinsics(format!(
                "focal lengths must be finite and non-zero, got fx={}, fy={}",
                fx, fy
            )));
        }
        if !cx.is_finite() || !cy.is_finite() {
            return Err(Error::InvalidIntrinsics(format!(
                "principal point must be finite, got ({}, {})",
                cx, cy
            )));
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Construct from a flat record.
    ///
    /// Accepts `[f, cx, cy]` (shared focal length, as stored in the dataset
    /// records) or `[fx, fy, cx, cy]`.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match *values {
            [f, cx, cy] => Self::new(f, f, cx, cy),
            [fx, fy, cx, cy] => Self::new(fx, fy, cx, cy),
            _ => Err(Error::InvalidIntrinsics(format!(
                "expected 3 or 4 values, got {}",
                values.len()
            ))),
        }
    }

    /// Back-project pixel `(u, v)` at depth `d` to a camera-space point.
    ///
    /// X = (u - cx) * d / fx
    /// Y = (v - cy) * d / fy
    /// Z = d
    #[inline]
    pub fn back_project(&self, u: f64, v: f64, depth: f64) -> Vector3<f64> {
        Vector3::new(
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        )
    }

    /// Project a camera-space point to pixel coordinates `(u, v)`.
    ///
    /// Depths below `min_depth` (or NaN) are raised to `min_depth` first, so
    /// points on or behind the camera plane still yield finite coordinates.
    /// Returns the projection and whether clamping happened.
    #[inline]
    pub fn project_clamped(&self, point: &Vector3<f64>, min_depth: f64) -> (Vector2<f64>, bool) {
        let clamped = point.z < min_depth || point.z.is_nan();
        let z = if clamped { min_depth } else { point.z };
        let uv = Vector2::new(
            self.fx * point.x / z + self.cx,
            self.fy * point.y / z + self.cy,
        );
        (uv, clamped)
    }

    /// Get the 3x3 calibration matrix K.
    pub fn matrix(&self) -> nalgebra::Matrix3<f64> {
        nalgebra::Matrix3::new(
            self.fx, 0.0, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        )
    }
}
