//! Dense 2D displacement fields.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Channel order of an interleaved `(H, W, 2)` flow buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// `[dy, dx]` per pixel (row displacement first).
    RowCol,
    /// `[dx, dy]` per pixel, i.e. `[u, v]`, the usual ground-truth layout.
    XY,
}

/// Displacement from frame A to frame B, in pixels.
///
/// Both channels are indexed `(row, col)`. `dy` moves along rows (down is
/// positive), `dx` along columns (right is positive).
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    /// Row displacement.
    pub dy: DMatrix<f64>,
    /// Column displacement.
    pub dx: DMatrix<f64>,
}

impl FlowField {
    /// Create a flow field from its row and column channels.
    pub fn new(dy: DMatrix<f64>, dx: DMatrix<f64>) -> Result<Self> {
        if dy.shape() != dx.shape() {
            return Err(Error::shape("flow dx channel", dy.shape(), dx.shape()));
        }
        Ok(Self { dy, dx })
    }

    /// Create a flow field from `(u, v)` = `(dx, dy)` channels.
    pub fn from_uv(u: DMatrix<f64>, v: DMatrix<f64>) -> Result<Self> {
        Self::new(v, u)
    }

    /// A field of zero displacement.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            dy: DMatrix::zeros(height, width),
            dx: DMatrix::zeros(height, width),
        }
    }

    /// Decode an interleaved row-major `(H, W, 2)` buffer.
    pub fn from_interleaved(
        height: usize,
        width: usize,
        data: &[f64],
        order: ChannelOrder,
    ) -> Result<Self> {
        let expected = height * width * 2;
        if data.len() != expected {
            return Err(Error::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }

        let channel = |k: usize| {
            DMatrix::from_fn(height, width, |r, c| data[(r * width + c) * 2 + k])
        };
        let (dy, dx) = match order {
            ChannelOrder::RowCol => (channel(0), channel(1)),
            ChannelOrder::XY => (channel(1), channel(0)),
        };
        Ok(Self { dy, dx })
    }

    /// Encode as an interleaved row-major `(H, W, 2)` buffer.
    pub fn to_interleaved(&self, order: ChannelOrder) -> Vec<f64> {
        let (height, width) = self.shape();
        let mut out = Vec::with_capacity(height * width * 2);
        for r in 0..height {
            for c in 0..width {
                let (dy, dx) = self.get(r, c);
                match order {
                    ChannelOrder::RowCol => out.extend_from_slice(&[dy, dx]),
                    ChannelOrder::XY => out.extend_from_slice(&[dx, dy]),
                }
            }
        }
        out
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.dy.shape()
    }

    /// `(dy, dx)` at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> (f64, f64) {
        (self.dy[(row, col)], self.dx[(row, col)])
    }

    /// Per-pixel displacement length.
    pub fn magnitude(&self) -> DMatrix<f64> {
        self.dy.zip_map(&self.dx, |dy, dx| dy.hypot(dx))
    }

    /// Copy with every non-finite component replaced by zero.
    pub fn sanitized(&self) -> FlowField {
        let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
        FlowField {
            dy: self.dy.map(clean),
            dx: self.dx.map(clean),
        }
    }

    /// Fail with `ShapeMismatch` unless both channels have the same shape.
    ///
    /// Fields built by struct literal skip the check in [`FlowField::new`].
    pub(crate) fn check_channels(&self) -> Result<()> {
        if self.dx.shape() != self.dy.shape() {
            return Err(Error::shape("flow dx channel", self.dy.shape(), self.dx.shape()));
        }
        Ok(())
    }

    /// Fail with `ShapeMismatch` unless both channels have `shape`.
    pub(crate) fn check_shape(&self, what: &str, shape: (usize, usize)) -> Result<()> {
        self.check_channels()?;
        if self.shape() != shape {
            return Err(Error::shape(what, shape, self.shape()));
        }
        Ok(())
    }
}
