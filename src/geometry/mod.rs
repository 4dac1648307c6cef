//! Camera geometry primitives.
//!
//! This module provides the building blocks of flow synthesis:
//!
//! - Pinhole intrinsics for back-projecting pixels to 3D and projecting back
//! - Rigid motions (rotation + translation about an optional pivot)

mod intrinsics;
mod motion;

pub use intrinsics::CameraIntrinsics;
pub use motion::RigidMotion;
