//! Dense flow synthesis from depth and rigid motion.
//!
//! Every pixel with valid depth is back-projected to 3D, moved by the rigid
//! motion of the instance owning it (or by the camera motion when no instance
//! does), and re-projected with the same intrinsics. The displacement between
//! the original and re-projected pixel is the flow.
//!
//! Degenerate inputs are absorbed by value:
//!
//! - invalid depth yields zero flow
//! - points moved on or behind the camera plane are clamped to `depth_epsilon`
//! - overlapping masks are resolved by the configured [`OwnershipPolicy`]

mod ownership;

pub use ownership::{ownership_grid, OwnershipPolicy};

use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::depth::DepthMap;
use crate::flow_field::FlowField;
use crate::geometry::{CameraIntrinsics, RigidMotion};
use crate::mask::InstanceMask;
use crate::{Error, Result};

/// Configuration for flow composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Smallest depth a moved point is projected with.
    pub depth_epsilon: f64,
    /// Mask weights strictly above this value claim a pixel.
    pub mask_threshold: f64,
    /// Tie-break for pixels claimed by several instances.
    pub ownership: OwnershipPolicy,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            depth_epsilon: 1e-6,
            mask_threshold: 0.5,
            ownership: OwnershipPolicy::LowestIndex,
        }
    }
}

impl CompositorConfig {
    /// Check the configuration for invalid values.
    pub fn validate(&self) -> Result<()> {
        if !self.depth_epsilon.is_finite() || self.depth_epsilon <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "depth_epsilon must be finite and positive, got {}",
                self.depth_epsilon
            )));
        }
        if !self.mask_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "mask_threshold must be finite, got {}",
                self.mask_threshold
            )));
        }
        Ok(())
    }
}

/// Pixel counts collected while composing a flow field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionReport {
    /// Pixels skipped because of missing depth.
    pub invalid_depth: usize,
    /// Pixels whose moved point was clamped to `depth_epsilon`.
    pub clamped_projection: usize,
    /// Pixels whose flow was not finite and was zeroed.
    pub non_finite: usize,
    /// Pixels moved by the camera motion.
    pub background_pixels: usize,
    /// Pixels moved by each instance motion, by instance index.
    pub instance_pixels: Vec<usize>,
}

/// Composes dense flow from depth, instance motions and camera motion.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    /// Create a compositor, validating its configuration.
    pub fn new(config: CompositorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Synthesize the flow field.
    ///
    /// `instance_masks[i]` selects the pixels moved by `instance_motions[i]`.
    pub fn compose(
        &self,
        depth: &DepthMap,
        instance_motions: &[RigidMotion],
        instance_masks: &[InstanceMask],
        camera_motion: &RigidMotion,
        intrinsics: &CameraIntrinsics,
    ) -> Result<FlowField> {
        self.compose_with_report(depth, instance_motions, instance_masks, camera_motion, intrinsics)
            .map(|(flow, _)| flow)
    }

    /// Synthesize the flow field and report how each pixel was handled.
    pub fn compose_with_report(
        &self,
        depth: &DepthMap,
        instance_motions: &[RigidMotion],
        instance_masks: &[InstanceMask],
        camera_motion: &RigidMotion,
        intrinsics: &CameraIntrinsics,
    ) -> Result<(FlowField, CompositionReport)> {
        if instance_masks.len() != instance_motions.len() {
            return Err(Error::InstanceCountMismatch {
                masks: instance_masks.len(),
                motions: instance_motions.len(),
            });
        }
        let (height, width) = depth.shape();
        let owners = ownership_grid(
            instance_masks,
            height,
            width,
            self.config.mask_threshold,
            self.config.ownership,
        )?;

        let mut dy = DMatrix::zeros(height, width);
        let mut dx = DMatrix::zeros(height, width);
        let mut report = CompositionReport {
            instance_pixels: vec![0; instance_motions.len()],
            ..Default::default()
        };

        for c in 0..width {
            for r in 0..height {
                let d = depth.get(r, c);
                if !DepthMap::is_valid_depth(d) {
                    report.invalid_depth += 1;
                    continue;
                }

                let motion = match owners[(r, c)] {
                    Some(index) => {
                        report.instance_pixels[index] += 1;
                        &instance_motions[index]
                    }
                    None => {
                        report.background_pixels += 1;
                        camera_motion
                    }
                };

                let (u, v) = (c as f64, r as f64);
                let moved = motion.apply(&intrinsics.back_project(u, v, d));
                let (uv, clamped) = intrinsics.project_clamped(&moved, self.config.depth_epsilon);
                if clamped {
                    report.clamped_projection += 1;
                }

                let (dv, du) = (uv.y - v, uv.x - u);
                if dv.is_finite() && du.is_finite() {
                    dy[(r, c)] = dv;
                    dx[(r, c)] = du;
                } else {
                    report.non_finite += 1;
                }
            }
        }

        debug!(
            "Composed {}x{} flow: {} background, {:?} per instance, {} invalid depth, {} clamped, {} non-finite",
            height,
            width,
            report.background_pixels,
            report.instance_pixels,
            report.invalid_depth,
            report.clamped_projection,
            report.non_finite
        );

        Ok((FlowField { dy, dx }, report))
    }
}

/// Synthesize dense flow from depth and motion.
///
/// Convenience wrapper around [`Compositor::compose`].
pub fn dense_flow_from_motion(
    depth: &DepthMap,
    instance_motions: &[RigidMotion],
    instance_masks: &[InstanceMask],
    camera_motion: &RigidMotion,
    intrinsics: &CameraIntrinsics,
    config: &CompositorConfig,
) -> Result<FlowField> {
    Compositor::new(*config)?.compose(depth, instance_motions, instance_masks, camera_motion, intrinsics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0).unwrap()
    }

    #[test]
    fn test_config_validate() {
        assert!(CompositorConfig::default().validate().is_ok());

        let mut config = CompositorConfig::default();
        config.depth_epsilon = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.depth_epsilon = 1e-3;
        config.mask_threshold = f64::NAN;
        assert!(Compositor::new(config).is_err());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: CompositorConfig =
            serde_json::from_str(r#"{"ownership": "HighestWeight"}"#).unwrap();
        assert_eq!(config.ownership, OwnershipPolicy::HighestWeight);
        assert_eq!(config.mask_threshold, 0.5);
    }

    #[test]
    fn test_count_mismatch() {
        let depth = DepthMap::constant(2, 2, 1.0);
        let err = Compositor::default()
            .compose(
                &depth,
                &[RigidMotion::identity()],
                &[],
                &RigidMotion::identity(),
                &unit_intrinsics(),
            )
            .unwrap_err();
        assert_eq!(err, Error::InstanceCountMismatch { masks: 0, motions: 1 });
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let depth = DepthMap::constant(2, 2, 1.0);
        let mask = InstanceMask::from_rect(3, 2, 0..1, 0..1);
        let err = Compositor::default()
            .compose(
                &depth,
                &[RigidMotion::identity()],
                &[mask],
                &RigidMotion::identity(),
                &unit_intrinsics(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_invalid_depth_yields_zero_flow() {
        let depth = DepthMap::from_row_slice(1, 4, &[0.0, -2.0, f64::NAN, 5.0]).unwrap();
        let camera = RigidMotion::from_translation(1.0, 1.0, 0.0);
        let (flow, report) = Compositor::default()
            .compose_with_report(&depth, &[], &[], &camera, &unit_intrinsics())
            .unwrap();

        for c in 0..3 {
            assert_eq!(flow.get(0, c), (0.0, 0.0));
        }
        assert_relative_eq!(flow.dx[(0, 3)], 0.2, epsilon = 1e-12);
        assert_relative_eq!(flow.dy[(0, 3)], 0.2, epsilon = 1e-12);
        assert_eq!(report.invalid_depth, 3);
        assert_eq!(report.background_pixels, 1);
    }

    #[test]
    fn test_point_behind_camera_is_clamped() {
        // z' = 1 - 2 = -1 -> clamped to epsilon
        let depth = DepthMap::constant(1, 2, 1.0);
        let camera = RigidMotion::from_translation(0.0, 0.0, -2.0);
        let config = CompositorConfig {
            depth_epsilon: 0.5,
            ..Default::default()
        };
        let (flow, report) = Compositor::new(config)
            .unwrap()
            .compose_with_report(&depth, &[], &[], &camera, &unit_intrinsics())
            .unwrap();

        assert_eq!(report.clamped_projection, 2);
        // pixel (0, 1): X = 1 -> u' = 1 / 0.5 = 2
        assert_relative_eq!(flow.dx[(0, 1)], 1.0, epsilon = 1e-12);
        assert!(flow.dx.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_finite_motion_output_is_zeroed() {
        let depth = DepthMap::constant(1, 1, 1.0);
        let camera = RigidMotion::from_translation(f64::INFINITY, 0.0, 0.0);
        let (flow, report) = Compositor::default()
            .compose_with_report(&depth, &[], &[], &camera, &unit_intrinsics())
            .unwrap();
        assert_eq!(flow.get(0, 0), (0.0, 0.0));
        assert_eq!(report.non_finite, 1);
    }

    #[test]
    fn test_report_counts_instances() {
        let depth = DepthMap::constant(2, 2, 4.0);
        let masks = vec![
            InstanceMask::from_rect(2, 2, 0..1, 0..2),
            InstanceMask::from_rect(2, 2, 0..2, 0..1),
        ];
        let motions = vec![RigidMotion::identity(); 2];
        let (_, report) = Compositor::default()
            .compose_with_report(&depth, &motions, &masks, &RigidMotion::identity(), &unit_intrinsics())
            .unwrap();
        // (0,0) overlap goes to instance 0
        assert_eq!(report.instance_pixels, vec![2, 1]);
        assert_eq!(report.background_pixels, 1);
    }

    #[test]
    fn test_rotating_instance_about_pivot() {
        // Rotate about the point seen at pixel (0, 0): that pixel does not move.
        let k = CameraIntrinsics::new(100.0, 100.0, 0.0, 0.0).unwrap();
        let depth = DepthMap::constant(1, 2, 10.0);
        let mask = InstanceMask::from_rect(1, 2, 0..1, 0..2);
        let motion = RigidMotion::from_euler_angles(0.0, 0.2, 0.0, Vector3::zeros())
            .with_pivot(Vector3::new(0.0, 0.0, 10.0));

        let flow = dense_flow_from_motion(
            &depth,
            &[motion],
            &[mask],
            &RigidMotion::identity(),
            &k,
            &CompositorConfig::default(),
        )
        .unwrap();

        assert_relative_eq!(flow.dx[(0, 0)], 0.0, epsilon = 1e-9);
        assert!(flow.dx[(0, 1)].abs() > 1e-6);
    }
}
