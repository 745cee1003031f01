//! Sobel gradient estimation and direction quantization.
//!
//! [`gradients`] convolves a grayscale raster with both Sobel kernels
//! and derives per-pixel magnitude and a quantized [`AngleClass`]. The
//! derivative rasters go through the ordinary convolution clamp, so
//! they hold only the non-negative part of each response.

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::convolve::{BoundaryPolicy, clamp_to_u8, convolve};
use crate::kernel::Kernel;
use crate::types::{Dimensions, Raster};

/// A gradient direction quantized to one of four orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum AngleClass {
    /// Horizontal gradient (vertical edge).
    #[default]
    Deg0,
    /// Rising diagonal.
    Deg45,
    /// Vertical gradient (horizontal edge).
    Deg90,
    /// Falling diagonal.
    Deg135,
}

impl AngleClass {
    /// Quantize an angle in degrees.
    ///
    /// Negative angles are shifted by 180° first. Bins are half-open:
    /// `[22.5, 67.5)` → 45°, `[67.5, 112.5)` → 90°, `[112.5, 157.5)` →
    /// 135°, and everything else → 0°.
    #[must_use]
    pub fn from_degrees(angle: f32) -> Self {
        let angle = if angle < 0.0 { angle + 180.0 } else { angle };
        if (22.5..67.5).contains(&angle) {
            Self::Deg45
        } else if (67.5..112.5).contains(&angle) {
            Self::Deg90
        } else if (112.5..157.5).contains(&angle) {
            Self::Deg135
        } else {
            Self::Deg0
        }
    }

    /// Classify a gradient from its x and y derivatives.
    ///
    /// A zero x-derivative is vertical when `gy != 0` and 0° otherwise;
    /// anything else is classified from `atan(gy / gx)`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_gradient(gx: f32, gy: f32) -> Self {
        if gx == 0.0 {
            return if gy == 0.0 { Self::Deg0 } else { Self::Deg90 };
        }
        Self::from_degrees((gy / gx).atan().to_degrees())
    }

    /// The angle in whole degrees.
    #[must_use]
    pub const fn degrees(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg45 => 45,
            Self::Deg90 => 90,
            Self::Deg135 => 135,
        }
    }

    /// Offsets `(dx, dy)` of the two neighbours lying along this
    /// direction.
    #[must_use]
    pub const fn neighbor_offsets(self) -> [(i32, i32); 2] {
        match self {
            Self::Deg0 => [(-1, 0), (1, 0)],
            Self::Deg45 => [(1, 1), (-1, -1)],
            Self::Deg90 => [(0, -1), (0, 1)],
            Self::Deg135 => [(1, -1), (-1, 1)],
        }
    }
}

/// A raster-shaped grid of [`AngleClass`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionMap {
    classes: Vec<AngleClass>,
    width: u32,
    height: u32,
}

impl DirectionMap {
    /// Build a map by evaluating `f` at every coordinate, row-major.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> AngleClass) -> Self {
        let classes = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            classes,
            width,
            height,
        }
    }

    /// A map filled with a single class.
    #[must_use]
    pub fn uniform(width: u32, height: u32, class: AngleClass) -> Self {
        Self::from_fn(width, height, |_, _| class)
    }

    /// Width and height of the map.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Class at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the map.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> AngleClass {
        assert!(
            x < self.width && y < self.height,
            "direction ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height,
        );
        self.classes[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Render the map as a raster holding each class's degree value.
    ///
    /// Useful for inspecting the direction stage alongside the other
    /// intermediates.
    #[must_use]
    pub fn to_raster(&self) -> Raster {
        Raster::from_fn(self.width, self.height, |x, y| {
            Luma([self.get(x, y).degrees()])
        })
    }
}

/// The four outputs of the gradient stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gradients {
    /// Clamped response of [`Kernel::sobel_x`].
    pub x: Raster,
    /// Clamped response of [`Kernel::sobel_y`].
    pub y: Raster,
    /// `round(sqrt(x² + y²))`, clamped to 255.
    pub magnitude: Raster,
    /// Quantized direction of each gradient.
    pub direction: DirectionMap,
}

impl Gradients {
    /// Dimensions shared by every gradient raster.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.magnitude)
    }
}

/// Run both Sobel kernels over `src` and derive magnitude and
/// direction.
#[must_use = "returns the gradient rasters"]
pub fn gradients(src: &Raster, policy: BoundaryPolicy) -> Gradients {
    let x = convolve(src, &Kernel::sobel_x(), policy);
    let y = convolve(src, &Kernel::sobel_y(), policy);
    let (width, height) = src.dimensions();

    let magnitude = Raster::from_fn(width, height, |px, py| {
        let gx = f32::from(x.get_pixel(px, py).0[0]);
        let gy = f32::from(y.get_pixel(px, py).0[0]);
        Luma([clamp_to_u8(gx.hypot(gy))])
    });
    let direction = DirectionMap::from_fn(width, height, |px, py| {
        AngleClass::from_gradient(
            f32::from(x.get_pixel(px, py).0[0]),
            f32::from(y.get_pixel(px, py).0[0]),
        )
    });

    log::debug!(
        "gradients: {width}x{height}, max magnitude {}",
        magnitude.pixels().map(|p| p.0[0]).max().unwrap_or(0),
    );

    Gradients {
        x,
        y,
        magnitude,
        direction,
    }
}
