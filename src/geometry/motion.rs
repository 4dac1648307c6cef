//! Rigid 3D motion.

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A rigid motion between two time steps.
///
/// A point `p` moves to `R * (p - pivot) + pivot + t`. With the default zero
/// pivot this is "rotate, then translate". Object motions are usually
/// expressed about the object's center, camera motions about the origin.
///
/// The rotation is taken as given and is not re-orthonormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidMotion {
    /// 3x3 rotation matrix.
    pub rotation: Matrix3<f64>,
    /// Translation applied after rotation.
    pub translation: Vector3<f64>,
    /// Center of rotation.
    #[serde(default = "zero_pivot")]
    pub pivot: Vector3<f64>,
}

fn zero_pivot() -> Vector3<f64> {
    Vector3::zeros()
}

impl Default for RigidMotion {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidMotion {
    /// Length of a flat motion record without a pivot.
    pub const FLAT_LEN: usize = 12;
    /// Length of a flat motion record with a pivot.
    pub const FLAT_LEN_WITH_PIVOT: usize = 15;

    /// Create a motion from a rotation matrix and a translation vector.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
            pivot: Vector3::zeros(),
        }
    }

    /// The motion that leaves every point in place.
    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// A pure translation.
    pub fn from_translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self::new(Matrix3::identity(), Vector3::new(tx, ty, tz))
    }

    /// A rotation from roll/pitch/yaw angles (radians) followed by a translation.
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64, translation: Vector3<f64>) -> Self {
        let rotation = Rotation3::from_euler_angles(roll, pitch, yaw).into_inner();
        Self::new(rotation, translation)
    }

    /// Return a copy rotating about `pivot` instead of the origin.
    pub fn with_pivot(mut self, pivot: Vector3<f64>) -> Self {
        self.pivot = pivot;
        self
    }

    /// Decode a flat motion record.
    ///
    /// Layout: 9 rotation entries (row-major), 3 translation entries and,
    /// optionally, 3 pivot entries. All values must be finite.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != Self::FLAT_LEN && values.len() != Self::FLAT_LEN_WITH_PIVOT {
            return Err(Error::InvalidMotion(format!(
                "expected {} or {} values, got {}",
                Self::FLAT_LEN,
                Self::FLAT_LEN_WITH_PIVOT,
                values.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidMotion(format!(
                "non-finite value {} at index {}",
                values[pos], pos
            )));
        }

        let rotation = Matrix3::from_row_slice(&values[0..9]);
        let translation = Vector3::from_column_slice(&values[9..12]);
        let pivot = if values.len() == Self::FLAT_LEN_WITH_PIVOT {
            Vector3::from_column_slice(&values[12..15])
        } else {
            Vector3::zeros()
        };

        Ok(Self {
            rotation,
            translation,
            pivot,
        })
    }

    /// Move a point by this motion.
    #[inline]
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (point - self.pivot) + self.pivot + self.translation
    }

    /// Translation of the equivalent motion about the origin.
    fn origin_translation(&self) -> Vector3<f64> {
        self.translation + self.pivot - self.rotation * self.pivot
    }

    /// The motion equivalent to applying `self` and then `next`.
    ///
    /// The result has a zero pivot.
    pub fn compose(&self, next: &RigidMotion) -> RigidMotion {
        RigidMotion::new(
            next.rotation * self.rotation,
            next.rotation * self.origin_translation() + next.origin_translation(),
        )
    }

    /// Whether this motion moves no point (within `tolerance`).
    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.rotation - Matrix3::identity()).amax() <= tolerance
            && self.origin_translation().amax() <= tolerance
    }
}
