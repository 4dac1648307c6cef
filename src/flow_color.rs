//! Flow color-wheel visualization.
//!
//! Direction maps to hue, magnitude to saturation:
//!
//! - hue = `atan2(dy, dx) / 2pi`, wrapped into `[0, 1)`, so rightward flow is
//!   red, downward yellow-green, leftward cyan and upward violet
//! - saturation = `|flow| * 8 / max_flow`, clamped to `[0, 1]`
//! - value = 1
//!
//! Zero flow is white. Masked-out pixels are black.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::flow_field::FlowField;
use crate::image::RgbImage;
use crate::mask::ValidityMask;
use crate::Result;

/// Magnitudes at `max_flow / SATURATION_STEPS` and above are fully saturated.
const SATURATION_STEPS: f64 = 8.0;

/// Normalization of flow magnitude before mapping it to saturation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ColorScale {
    /// Normalize by the largest absolute flow component over valid pixels.
    #[default]
    PerFieldMax,
    /// Normalize by a fixed maximum (at least 1 pixel).
    Fixed(f64),
}

impl ColorScale {
    pub(crate) fn max_flow(&self, flow: &FlowField, mask: Option<&ValidityMask>) -> f64 {
        match *self {
            ColorScale::Fixed(max_flow) => max_flow.max(1.0),
            ColorScale::PerFieldMax => {
                let (height, width) = flow.shape();
                let mut max_flow: f64 = 0.0;
                for c in 0..width {
                    for r in 0..height {
                        if mask.map_or(true, |m| m.is_valid(r, c)) {
                            let (dy, dx) = flow.get(r, c);
                            for v in [dy.abs(), dx.abs()] {
                                if v.is_finite() && v > max_flow {
                                    max_flow = v;
                                }
                            }
                        }
                    }
                }
                max_flow
            }
        }
    }
}

/// Convert HSV (all in `[0, 1]`) to RGB.
pub(crate) fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let chroma = v * s;
    let h6 = (h * 6.0).rem_euclid(6.0);
    let x = chroma * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = v - chroma;
    let (r, g, b) = match h6.floor() as u8 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Encode a single displacement as a color, given the normalization maximum.
#[inline]
fn encode(dy: f64, dx: f64, max_flow: f64) -> [f64; 3] {
    if !dy.is_finite() || !dx.is_finite() {
        return [0.0; 3];
    }
    let hue = (dy.atan2(dx) / (2.0 * PI)).rem_euclid(1.0);
    let saturation = if max_flow > 0.0 {
        (dy.hypot(dx) * SATURATION_STEPS / max_flow).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let value = (SATURATION_STEPS - saturation).clamp(0.0, 1.0);
    hsv_to_rgb(hue, saturation, value)
}

/// Map a flow field to an RGB image.
///
/// Pixels outside `mask` (when given) are black and do not contribute to the
/// per-field normalization.
pub fn flow_to_color(
    flow: &FlowField,
    mask: Option<&ValidityMask>,
    scale: ColorScale,
) -> Result<RgbImage> {
    match mask {
        Some(m) => flow.check_shape("flow", m.shape())?,
        None => flow.check_channels()?,
    }

    let max_flow = scale.max_flow(flow, mask);
    Ok(render(flow, mask, max_flow))
}

/// Color every pixel against a known normalization maximum.
pub(crate) fn render(flow: &FlowField, mask: Option<&ValidityMask>, max_flow: f64) -> RgbImage {
    let (height, width) = flow.shape();
    RgbImage::from_fn(height, width, |r, c| {
        if mask.map_or(true, |m| m.is_valid(r, c)) {
            let (dy, dx) = flow.get(r, c);
            encode(dy, dx, max_flow)
        } else {
            [0.0; 3]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn single(dy: f64, dx: f64) -> FlowField {
        FlowField::new(DMatrix::from_element(1, 1, dy), DMatrix::from_element(1, 1, dx)).unwrap()
    }

    fn assert_color(actual: [f64; 3], expected: [f64; 3]) {
        for k in 0..3 {
            assert_relative_eq!(actual[k], expected[k], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_axis_directions() {
        let cases = [
            ((0.0, 1.0), [1.0, 0.0, 0.0]),  // right: red
            ((1.0, 0.0), [0.5, 1.0, 0.0]),  // down
            ((0.0, -1.0), [0.0, 1.0, 1.0]), // left: cyan
            ((-1.0, 0.0), [0.5, 0.0, 1.0]), // up
        ];
        for ((dy, dx), expected) in cases {
            let img = flow_to_color(&single(dy, dx), None, ColorScale::PerFieldMax).unwrap();
            assert_color(img.get(0, 0), expected);
        }
    }

    #[test]
    fn test_zero_flow_is_white() {
        let img = flow_to_color(&FlowField::zeros(2, 2), None, ColorScale::PerFieldMax).unwrap();
        for px in img.pixels() {
            assert_color(*px, [1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn test_fixed_scale_partial_saturation() {
        // |flow| * 8 / 16 = 0.5
        let img = flow_to_color(&single(0.0, 1.0), None, ColorScale::Fixed(16.0)).unwrap();
        assert_color(img.get(0, 0), [1.0, 0.5, 0.5]);
    }

    #[test]
    fn test_fixed_scale_floor_of_one() {
        let a = flow_to_color(&single(0.0, 0.05), None, ColorScale::Fixed(0.0)).unwrap();
        let b = flow_to_color(&single(0.0, 0.05), None, ColorScale::Fixed(1.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_masked_pixels_are_black_and_ignored() {
        let flow = FlowField::new(
            DMatrix::from_row_slice(1, 2, &[0.0, 0.0]),
            DMatrix::from_row_slice(1, 2, &[1.0, 100.0]),
        )
        .unwrap();
        let mask = ValidityMask::from_bools(1, 2, &[true, false]).unwrap();
        let img = flow_to_color(&flow, Some(&mask), ColorScale::PerFieldMax).unwrap();
        assert_color(img.get(0, 1), [0.0, 0.0, 0.0]);
        // normalized by 1.0, not 100.0
        assert_color(img.get(0, 0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let mask = ValidityMask::all_valid(2, 2);
        assert!(flow_to_color(&single(0.0, 1.0), Some(&mask), ColorScale::PerFieldMax).is_err());
    }

    #[test]
    fn test_mismatched_channels_without_mask() {
        let flow = FlowField {
            dy: DMatrix::zeros(2, 2),
            dx: DMatrix::zeros(1, 1),
        };
        assert!(matches!(
            flow_to_color(&flow, None, ColorScale::PerFieldMax),
            Err(crate::Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_hsv_to_rgb_gray() {
        assert_color(hsv_to_rgb(0.3, 0.0, 0.25), [0.25, 0.25, 0.25]);
    }
}
