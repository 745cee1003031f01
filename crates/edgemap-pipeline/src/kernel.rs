//! Convolution kernels: a validated weight grid plus the Gaussian and
//! Sobel builders used by the edge detectors.
//!
//! Kernels are stored row-major and addressed by offset from their
//! centre cell, so `weight(-1, 0)` is the tap immediately left of the
//! centre. Both dimensions are odd, which guarantees the centre exists.

use std::f64::consts::PI;

use crate::convolve::ZERO_SUM_EPSILON;
use crate::types::EdgeError;

/// An immutable 2D grid of convolution weights with odd dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Vec<f32>,
    width: u32,
    height: u32,
}

impl Kernel {
    /// Construct a kernel from row-major weights.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidKernelShape`] if either dimension is
    /// zero or even, or if `weights.len() != width * height`.
    pub fn new(width: u32, height: u32, weights: Vec<f32>) -> Result<Self, EdgeError> {
        let odd = |n: u32| n % 2 == 1;
        let expected = usize::try_from(u64::from(width) * u64::from(height)).ok();
        if !odd(width) || !odd(height) || expected != Some(weights.len()) {
            return Err(EdgeError::InvalidKernelShape {
                width,
                height,
                len: weights.len(),
            });
        }
        Ok(Self {
            weights,
            width,
            height,
        })
    }

    /// The 1x1 identity kernel `[[1]]`.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            weights: vec![1.0],
            width: 1,
            height: 1,
        }
    }

    /// Build the 5x5 Gaussian smoothing kernel for `sigma`.
    ///
    /// Cell `(x, y)` for `x, y` in `-2..=2` holds
    /// `exp(-(x² + y²) / (2σ²)) / (2πσ²)`. The weights are not
    /// normalized; [`convolve`](crate::convolve::convolve) divides by
    /// [`sum`](Self::sum) instead.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidSigma`] if `sigma` is not a finite
    /// positive number, or if it is so large that the weight sum falls
    /// under [`ZERO_SUM_EPSILON`] or so small that the centre weight
    /// overflows a full-intensity response.
    pub fn gaussian(sigma: f32) -> Result<Self, EdgeError> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(EdgeError::InvalidSigma(sigma));
        }
        let sigma_sq = f64::from(sigma) * f64::from(sigma);
        let scale = 1.0 / (2.0 * PI * sigma_sq);
        let weights = Self::offsets(5, 5)
            .map(|(dx, dy)| {
                let r_sq = f64::from(dx * dx + dy * dy);
                narrow(scale * (-r_sq / (2.0 * sigma_sq)).exp())
            })
            .collect();
        let kernel = Self::new(5, 5, weights)?;
        // The sum is the convolution divisor; every response is bounded
        // by 255 times it.
        let sum = kernel.sum();
        if sum < ZERO_SUM_EPSILON || !(sum * f32::from(u8::MAX)).is_finite() {
            return Err(EdgeError::InvalidSigma(sigma));
        }
        Ok(kernel)
    }

    /// The horizontal 3x3 Sobel kernel: right column minus left column.
    ///
    /// ```text
    /// -1  0  1
    /// -2  0  2
    /// -1  0  1
    /// ```
    #[must_use]
    pub fn sobel_x() -> Self {
        Self::from_offsets(3, 3, |dx, dy| dx * (2 - dy.abs()))
    }

    /// The vertical 3x3 Sobel kernel: top row minus bottom row.
    ///
    /// ```text
    ///  1  2  1
    ///  0  0  0
    /// -1 -2 -1
    /// ```
    #[must_use]
    pub fn sobel_y() -> Self {
        Self::from_offsets(3, 3, |dx, dy| -dy * (2 - dx.abs()))
    }

    /// Kernel width in taps.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Kernel height in taps.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Horizontal reach of the kernel from its centre (`width / 2`).
    #[must_use]
    pub const fn half_width(&self) -> u32 {
        self.width / 2
    }

    /// Vertical reach of the kernel from its centre (`height / 2`).
    #[must_use]
    pub const fn half_height(&self) -> u32 {
        self.height / 2
    }

    /// Weight at offset `(dx, dy)` from the centre.
    ///
    /// Offsets must lie within `±half_width` / `±half_height`.
    #[must_use]
    pub fn weight(&self, dx: i32, dy: i32) -> f32 {
        let x = self.half_width().wrapping_add_signed(dx);
        let y = self.half_height().wrapping_add_signed(dy);
        self.weights[(y * self.width + x) as usize]
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Row-major weights.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// All `(dx, dy)` centre offsets of a `width x height` grid, row-major.
    fn offsets(width: u32, height: u32) -> impl Iterator<Item = (i32, i32)> {
        #[allow(clippy::cast_possible_wrap)]
        let (hw, hh) = ((width / 2) as i32, (height / 2) as i32);
        (-hh..=hh).flat_map(move |dy| (-hw..=hw).map(move |dx| (dx, dy)))
    }

    /// Build a kernel of known-valid shape from an integer weight rule.
    fn from_offsets(width: u32, height: u32, rule: impl Fn(i32, i32) -> i32) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let weights = Self::offsets(width, height)
            .map(|(dx, dy)| rule(dx, dy) as f32)
            .collect();
        Self {
            weights,
            width,
            height,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn narrow(w: f64) -> f32 {
    w as f32
}
