//! Generic 2D convolution over a grayscale raster.
//!
//! Every filtering step in the pipeline (Gaussian smoothing, both Sobel
//! derivatives) goes through [`convolve`]. The output is normalized by
//! the kernel's weight sum, rounded, and clamped back into `u8`, so
//! signed responses such as a falling Sobel edge saturate at zero.
//!
//! # Boundary handling
//!
//! [`BoundaryPolicy`] decides what happens when a kernel tap lands
//! outside the raster. The default, [`BoundaryPolicy::Truncate`], ends
//! the current kernel row at the first out-of-range tap. Taps to the
//! left of the centre therefore drop the whole row, while taps to the
//! right keep the part of the row already accumulated. This darkens
//! the left and top borders and is kept as the reference behaviour.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::kernel::Kernel;
use crate::types::Raster;

/// Weight sums smaller than this in magnitude are treated as 1.
///
/// Zero-sum kernels (Sobel, Laplacian) would otherwise divide by zero.
pub const ZERO_SUM_EPSILON: f32 = 1e-4;

/// How convolution treats kernel taps outside the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Stop accumulating the current kernel row at the first
    /// out-of-range tap.
    #[default]
    Truncate,
    /// Read out-of-range samples as 0 and keep going.
    Zero,
    /// Clamp coordinates to the nearest edge sample.
    Extend,
    /// Wrap coordinates around the opposite edge.
    Wrap,
}

/// Where a single kernel tap reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tap {
    /// Read the sample at this in-range coordinate.
    At(u32),
    /// Contribute nothing and move on to the next tap.
    Skip,
    /// Contribute nothing and abandon the rest of this kernel row.
    EndRow,
}

impl BoundaryPolicy {
    /// Map a possibly out-of-range coordinate along an axis of length
    /// `len` to the tap it produces.
    #[must_use]
    pub fn resolve(self, i: i64, len: u32) -> Tap {
        let len_i = i64::from(len);
        if (0..len_i).contains(&i) {
            return Tap::At(to_coord(i));
        }
        match self {
            Self::Truncate => Tap::EndRow,
            Self::Zero => Tap::Skip,
            _ if len == 0 => Tap::Skip,
            Self::Extend => Tap::At(to_coord(i.clamp(0, len_i - 1))),
            Self::Wrap => Tap::At(to_coord(i.rem_euclid(len_i))),
        }
    }
}

/// Convert an in-range `i64` coordinate back to `u32`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn to_coord(i: i64) -> u32 {
    i as u32
}

/// Round and clamp a filter response into the `u8` intensity range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convolve `src` with `kernel` under `policy`.
///
/// Each output sample is `Σ src[x+dx, y+dy] · kernel(dx, dy)` over the
/// kernel footprint, divided by the kernel's weight sum (or by 1 when
/// that sum is within [`ZERO_SUM_EPSILON`] of zero), rounded and
/// clamped to `[0, 255]`.
///
/// The kernel is applied as a correlation: `kernel(1, 0)` weights the
/// sample to the right of the output pixel. `src` is never modified and
/// the result has the same dimensions.
#[must_use = "returns the filtered raster"]
pub fn convolve(src: &Raster, kernel: &Kernel, policy: BoundaryPolicy) -> Raster {
    let (width, height) = src.dimensions();
    let sum = kernel.sum();
    let divisor = if sum.abs() < ZERO_SUM_EPSILON { 1.0 } else { sum };
    #[allow(clippy::cast_possible_wrap)]
    let (hw, hh) = (kernel.half_width() as i32, kernel.half_height() as i32);

    Raster::from_fn(width, height, |x, y| {
        let mut acc = 0.0_f32;
        for dy in -hh..=hh {
            let row = policy.resolve(i64::from(y) + i64::from(dy), height);
            for dx in -hw..=hw {
                let col = policy.resolve(i64::from(x) + i64::from(dx), width);
                match (col, row) {
                    (Tap::At(sx), Tap::At(sy)) => {
                        acc += f32::from(src.get_pixel(sx, sy).0[0]) * kernel.weight(dx, dy);
                    }
                    (Tap::EndRow, _) | (_, Tap::EndRow) => break,
                    _ => {}
                }
            }
        }
        Luma([clamp_to_u8(acc / divisor)])
    })
}
