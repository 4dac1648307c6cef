//! Pixel-to-instance ownership.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::mask::InstanceMask;
use crate::{Error, Result};

/// How a pixel claimed by several instance masks picks its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OwnershipPolicy {
    /// The claiming instance with the lowest index wins.
    #[default]
    LowestIndex,
    /// The claiming instance with the greatest mask weight wins.
    /// Equal weights fall back to the lowest index.
    HighestWeight,
}

/// Compute the owning instance of every pixel.
///
/// An instance claims a pixel when its mask weight is strictly greater than
/// `threshold`. `None` means no instance claims the pixel and it moves with the
/// camera. Every mask must have shape `(height, width)`, otherwise
/// `ShapeMismatch` is returned.
pub fn ownership_grid(
    masks: &[InstanceMask],
    height: usize,
    width: usize,
    threshold: f64,
    policy: OwnershipPolicy,
) -> Result<DMatrix<Option<usize>>> {
    for mask in masks {
        if mask.shape() != (height, width) {
            return Err(Error::shape("instance mask", (height, width), mask.shape()));
        }
    }

    let mut owners: DMatrix<Option<usize>> = DMatrix::from_element(height, width, None);

    match policy {
        OwnershipPolicy::LowestIndex => {
            // Later instances only fill pixels nobody claimed yet.
            for (index, mask) in masks.iter().enumerate() {
                for c in 0..width {
                    for r in 0..height {
                        if owners[(r, c)].is_none() && mask.claims(r, c, threshold) {
                            owners[(r, c)] = Some(index);
                        }
                    }
                }
            }
        }
        OwnershipPolicy::HighestWeight => {
            let mut best = DMatrix::from_element(height, width, f64::NEG_INFINITY);
            for (index, mask) in masks.iter().enumerate() {
                for c in 0..width {
                    for r in 0..height {
                        let w = mask.weight(r, c);
                        // strict: ties keep the earlier instance
                        if w > threshold && w > best[(r, c)] {
                            best[(r, c)] = w;
                            owners[(r, c)] = Some(index);
                        }
                    }
                }
            }
        }
    }

    Ok(owners)
}
