//! RGB images produced by the visualizations.

/// A row-major RGB image with floating-point channels.
///
/// Visualizations produce values in `[0, 1]`; raw error images may exceed 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    height: usize,
    width: usize,
    pixels: Vec<[f64; 3]>,
}

impl RgbImage {
    /// An all-black image.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            pixels: vec![[0.0; 3]; height * width],
        }
    }

    /// Build an image by evaluating `f(row, col)` for every pixel.
    pub fn from_fn<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> [f64; 3],
    {
        let mut pixels = Vec::with_capacity(height * width);
        for r in 0..height {
            for c in 0..width {
                pixels.push(f(r, c));
            }
        }
        Self {
            height,
            width,
            pixels,
        }
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Color at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> [f64; 3] {
        self.pixels[row * self.width + col]
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[[f64; 3]] {
        &self.pixels
    }

    /// Mean of each channel over all pixels.
    pub fn channel_means(&self) -> [f64; 3] {
        if self.pixels.is_empty() {
            return [0.0; 3];
        }
        let mut sum = [0.0; 3];
        for px in &self.pixels {
            for k in 0..3 {
                sum[k] += px[k];
            }
        }
        let n = self.pixels.len() as f64;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }

    /// Interleaved 8-bit RGB, scaling `[0, 1]` to `[0, 255]` and clamping.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| px.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }
}
