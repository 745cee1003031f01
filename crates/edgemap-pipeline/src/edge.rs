//! Edge detectors and edge map inversion.
//!
//! [`canny`] sequences the full detector: grayscale, Gaussian smoothing,
//! Sobel gradients, non-maximal suppression, and hysteresis. [`sobel`]
//! is the cheap alternative that skips everything after the two
//! directional convolutions and simply sums them.
//!
//! Both return a raster the size of the input. Canny output is binary
//! (255 for edges, 0 elsewhere); Sobel output is a graded response.
//!
//! The optional [`invert_edge_map`] function flips a binary map so that
//! background becomes foreground.

use image::{GenericImageView, Luma, Pixel};

use crate::convolve::{BoundaryPolicy, convolve};
use crate::hysteresis::Linked;
use crate::kernel::Kernel;
use crate::pipeline::Pipeline;
use crate::types::{CannyConfig, EdgeError, Raster};

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Pixels whose suppressed gradient magnitude is at least
/// `config.high_threshold` are definite edges; those in
/// `low_threshold..high_threshold` are edges only if linked to a
/// definite edge through other such pixels.
///
/// # Errors
///
/// Returns [`EdgeError::InvalidSigma`] or
/// [`EdgeError::InvalidThresholdRange`] if `config` is invalid. No
/// stage runs in that case.
pub fn canny<I, P>(image: &I, config: &CannyConfig) -> Result<Raster, EdgeError>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    Ok(canny_linked(image, config)?.edges)
}

/// [`canny`], also reporting how hysteresis terminated.
///
/// # Errors
///
/// Same as [`canny`].
pub fn canny_linked<I, P>(image: &I, config: &CannyConfig) -> Result<Linked, EdgeError>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    Ok(Pipeline::new(image, *config)?
        .grayscale()
        .smooth()
        .compute_gradients()
        .suppress()
        .link()
        .into_linked())
}

/// Plain Sobel edge response.
///
/// Reduces `image` to grayscale, convolves it with both Sobel kernels
/// under `boundary`, and adds the two clamped responses pointwise,
/// saturating at 255. No smoothing, suppression, or thresholding.
#[must_use = "returns the Sobel response"]
pub fn sobel<I, P>(image: &I, boundary: BoundaryPolicy) -> Raster
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    sobel_response(&crate::grayscale::to_grayscale(image), boundary)
}

/// Sobel response of an already-grayscale raster.
pub(crate) fn sobel_response(gray: &Raster, boundary: BoundaryPolicy) -> Raster {
    let gx = convolve(gray, &Kernel::sobel_x(), boundary);
    let gy = convolve(gray, &Kernel::sobel_y(), boundary);
    let (width, height) = gray.dimensions();
    let response = Raster::from_fn(width, height, |x, y| {
        Luma([gx.get_pixel(x, y).0[0].saturating_add(gy.get_pixel(x, y).0[0])])
    });
    log::debug!("sobel: {width}x{height} boundary={boundary:?}");
    response
}

/// Invert a binary edge map (bitwise NOT).
///
/// Swaps edge pixels (255 → 0) and background pixels (0 → 255).
#[must_use = "returns the inverted edge map"]
pub fn invert_edge_map(edges: &Raster) -> Raster {
    Raster::from_fn(edges.width(), edges.height(), |x, y| {
        Luma([!edges.get_pixel(x, y).0[0]])
    })
}
