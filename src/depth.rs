//! Depth map input.

use nalgebra::DMatrix;

use crate::{Error, Result};

/// Per-pixel depth along the optical axis, indexed `(row, col)`.
///
/// A depth is valid when it is finite and strictly positive. Zero, negative
/// and non-finite values mark missing depth and are never back-projected.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    values: DMatrix<f64>,
}

impl DepthMap {
    /// Wrap a depth matrix (rows = image height).
    pub fn new(values: DMatrix<f64>) -> Self {
        Self { values }
    }

    /// Create a depth map from a row-major buffer.
    pub fn from_row_slice(height: usize, width: usize, data: &[f64]) -> Result<Self> {
        if data.len() != height * width {
            return Err(Error::InvalidBuffer {
                expected: height * width,
                got: data.len(),
            });
        }
        Ok(Self::new(DMatrix::from_row_slice(height, width, data)))
    }

    /// A depth map with the same depth everywhere.
    pub fn constant(height: usize, width: usize, depth: f64) -> Self {
        Self::new(DMatrix::from_element(height, width, depth))
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Depth at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    /// Whether a depth value can be back-projected.
    #[inline]
    pub fn is_valid_depth(depth: f64) -> bool {
        depth.is_finite() && depth > 0.0
    }

    /// Whether the depth at `(row, col)` can be back-projected.
    #[inline]
    pub fn is_valid_at(&self, row: usize, col: usize) -> bool {
        Self::is_valid_depth(self.get(row, col))
    }

    /// Number of pixels with valid depth.
    pub fn num_valid(&self) -> usize {
        self.values.iter().filter(|&&d| Self::is_valid_depth(d)).count()
    }

    /// The underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}

impl From<DMatrix<f64>> for DepthMap {
    fn from(values: DMatrix<f64>) -> Self {
        Self::new(values)
    }
}
