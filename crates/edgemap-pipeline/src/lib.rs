//! edgemap-pipeline: Pure edge detection pipeline (sans-IO).
//!
//! Converts raster images into edge maps through:
//! grayscale -> Gaussian smoothing -> Sobel gradients ->
//! non-maximal suppression -> hysteresis linking.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns in-memory rasters of the same size. Decoding and
//! encoding files lives in `edgemap-bench`.
//!
//! ```rust
//! # use edgemap_pipeline::{BoundaryPolicy, CannyConfig, EdgeError, Raster};
//! # fn run(image: &image::RgbImage) -> Result<(), EdgeError> {
//! let edges: Raster = edgemap_pipeline::canny(image, &CannyConfig::default())?;
//! let response: Raster = edgemap_pipeline::sobel(image, BoundaryPolicy::Extend);
//! # Ok(())
//! # }
//! ```
//!
//! Every stage is also exposed on its own ([`convolve::convolve`],
//! [`gradient::gradients`], [`suppress::suppress`],
//! [`hysteresis::hysteresis`]) and through the incremental [`Pipeline`].

pub mod convolve;
pub mod diagnostics;
pub mod edge;
pub mod gradient;
pub mod grayscale;
pub mod hysteresis;
pub mod kernel;
pub mod pipeline;
pub mod suppress;
pub mod types;

pub use convolve::BoundaryPolicy;
pub use edge::{canny, canny_linked, invert_edge_map, sobel};
pub use gradient::{AngleClass, DirectionMap, Gradients};
pub use hysteresis::{Linked, MAX_HYSTERESIS_PASSES, PixelClass};
pub use kernel::Kernel;
pub use pipeline::Pipeline;
pub use types::{CannyConfig, Dimensions, EdgeError, GrayImage, Raster, StagedResult};
