//! Instance and validity masks.

use nalgebra::DMatrix;

use crate::flow_field::FlowField;
use crate::{Error, Result};

/// Per-pixel membership weights of one object instance at the reference frame.
///
/// Binary masks use 1.0 / 0.0. Which weights count as a claim is decided by
/// the compositor's threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMask {
    weights: DMatrix<f64>,
}

impl InstanceMask {
    /// Wrap a weight matrix.
    pub fn new(weights: DMatrix<f64>) -> Self {
        Self { weights }
    }

    /// Build a binary mask from a row-major buffer of booleans.
    pub fn from_bools(height: usize, width: usize, data: &[bool]) -> Result<Self> {
        if data.len() != height * width {
            return Err(Error::InvalidBuffer {
                expected: height * width,
                got: data.len(),
            });
        }
        Ok(Self::new(DMatrix::from_row_iterator(
            height,
            width,
            data.iter().map(|&b| if b { 1.0 } else { 0.0 }),
        )))
    }

    /// A binary mask covering the rectangle `rows x cols` (half-open ranges).
    pub fn from_rect(
        height: usize,
        width: usize,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) -> Self {
        Self::new(DMatrix::from_fn(height, width, |r, c| {
            if rows.contains(&r) && cols.contains(&c) {
                1.0
            } else {
                0.0
            }
        }))
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.weights.shape()
    }

    /// Weight at `(row, col)`.
    #[inline]
    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.weights[(row, col)]
    }

    /// Whether this instance claims `(row, col)` under `threshold`.
    #[inline]
    pub fn claims(&self, row: usize, col: usize, threshold: f64) -> bool {
        self.weight(row, col) > threshold
    }
}

/// Pixels where reference flow exists and can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityMask {
    valid: DMatrix<bool>,
}

impl ValidityMask {
    /// Wrap a boolean matrix.
    pub fn new(valid: DMatrix<bool>) -> Self {
        Self { valid }
    }

    /// Every pixel valid.
    pub fn all_valid(height: usize, width: usize) -> Self {
        Self::new(DMatrix::from_element(height, width, true))
    }

    /// No pixel valid.
    pub fn none_valid(height: usize, width: usize) -> Self {
        Self::new(DMatrix::from_element(height, width, false))
    }

    /// Build from a row-major buffer.
    pub fn from_bools(height: usize, width: usize, data: &[bool]) -> Result<Self> {
        if data.len() != height * width {
            return Err(Error::InvalidBuffer {
                expected: height * width,
                got: data.len(),
            });
        }
        Ok(Self::new(DMatrix::from_row_slice(height, width, data)))
    }

    /// Build from a weight grid: weights above 0.5 are valid.
    pub fn from_weights(weights: &DMatrix<f64>) -> Self {
        Self::new(weights.map(|w| w > 0.5))
    }

    /// Mark pixels whose reference flow has both components finite.
    ///
    /// Ground truth stores undefined flow as NaN.
    pub fn from_reference_flow(reference: &FlowField) -> Self {
        let (height, width) = reference.shape();
        Self::new(DMatrix::from_fn(height, width, |r, c| {
            reference.dy[(r, c)].is_finite() && reference.dx[(r, c)].is_finite()
        }))
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.valid.shape()
    }

    /// Whether `(row, col)` is valid.
    #[inline]
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.valid[(row, col)]
    }

    /// Number of valid pixels.
    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Pixels valid in both masks.
    pub fn intersect(&self, other: &ValidityMask) -> Result<ValidityMask> {
        if self.shape() != other.shape() {
            return Err(Error::shape("validity mask", self.shape(), other.shape()));
        }
        Ok(Self::new(self.valid.zip_map(&other.valid, |a, b| a && b)))
    }

    /// The underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<bool> {
        &self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_mask_from_rect() {
        let mask = InstanceMask::from_rect(4, 4, 1..3, 2..4);
        assert!(mask.claims(1, 2, 0.5));
        assert!(mask.claims(2, 3, 0.5));
        assert!(!mask.claims(0, 2, 0.5));
        assert!(!mask.claims(1, 1, 0.5));
    }

    #[test]
    fn test_instance_mask_from_bools() {
        let mask = InstanceMask::from_bools(2, 2, &[true, false, false, true]).unwrap();
        assert_eq!(mask.weight(0, 0), 1.0);
        assert_eq!(mask.weight(0, 1), 0.0);
        assert!(InstanceMask::from_bools(2, 2, &[true]).is_err());
    }

    #[test]
    fn test_claims_is_strict() {
        let mask = InstanceMask::new(DMatrix::from_element(1, 1, 0.5));
        assert!(!mask.claims(0, 0, 0.5));
        assert!(mask.claims(0, 0, 0.25));
    }

    #[test]
    fn test_validity_from_reference_flow() {
        let dy = DMatrix::from_row_slice(1, 3, &[0.0, f64::NAN, 1.0]);
        let dx = DMatrix::from_row_slice(1, 3, &[0.0, 2.0, f64::INFINITY]);
        let flow = FlowField::new(dy, dx).unwrap();
        let mask = ValidityMask::from_reference_flow(&flow);
        assert!(mask.is_valid(0, 0));
        assert!(!mask.is_valid(0, 1));
        assert!(!mask.is_valid(0, 2));
        assert_eq!(mask.num_valid(), 1);
    }

    #[test]
    fn test_intersect() {
        let a = ValidityMask::from_bools(1, 3, &[true, true, false]).unwrap();
        let b = ValidityMask::from_bools(1, 3, &[false, true, true]).unwrap();
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.num_valid(), 1);
        assert!(both.is_valid(0, 1));

        let c = ValidityMask::all_valid(2, 3);
        assert!(matches!(a.intersect(&c), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_from_weights() {
        let w = DMatrix::from_row_slice(1, 3, &[0.0, 0.5, 1.0]);
        let mask = ValidityMask::from_weights(&w);
        assert_eq!(mask.num_valid(), 1);
        assert!(mask.is_valid(0, 2));
    }
}
