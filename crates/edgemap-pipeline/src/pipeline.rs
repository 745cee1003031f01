//! Incremental Canny pipeline: advance stage-by-stage, inspecting each
//! intermediate raster before continuing.
//!
//! Unlike [`crate::canny`] which runs the entire detector in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use edgemap_pipeline::{CannyConfig, EdgeError, Pipeline, Raster};
//! # fn run(image: &Raster) -> Result<(), EdgeError> {
//! let staged = Pipeline::new(image, CannyConfig::default())?
//!     .grayscale()
//!     .smooth()
//!     .compute_gradients()
//!     .suppress()
//!     .link()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. The caller can
//! inspect the current stage's output via accessor methods at any point.
//! Only [`Pipeline::new`] is fallible: the config is validated and the
//! smoothing kernel built before any stage runs.
//!
//! # Memory
//!
//! Every stage retains the rasters of the stages before it. By
//! [`EdgesLinked`] that is seven full-size `u8` rasters (grayscale,
//! smoothed, both derivatives, magnitude, suppressed, edges) plus the
//! direction grid. Callers that only want the edge map should
//! use [`crate::canny`], which drops the intermediates.

use image::{GenericImageView, Pixel};

use crate::convolve::convolve;
use crate::diagnostics::{StageMetrics, count_edge_pixels, count_nonzero_pixels};
use crate::gradient::Gradients;
use crate::hysteresis::Linked;
use crate::kernel::Kernel;
use crate::types::{CannyConfig, Dimensions, EdgeError, Raster, StagedResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Holds a borrow of the source image, the validated config and the
/// Gaussian kernel. Call [`grayscale`](Self::grayscale) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .grayscale() to continue"]
pub struct Pending<'a, I> {
    config: CannyConfig,
    kernel: Kernel,
    source: &'a I,
}

impl<'a, I, P> Pending<'a, I>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    /// The source image.
    #[must_use]
    pub const fn source(&self) -> &'a I {
        self.source
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &CannyConfig {
        &self.config
    }

    /// Reduce the source to grayscale and advance to [`Grayscaled`].
    pub fn grayscale(self) -> Grayscaled {
        let grayscale = crate::grayscale::to_grayscale(self.source);
        log::debug!("grayscale: {}", Dimensions::of(&grayscale));
        Grayscaled {
            config: self.config,
            kernel: self.kernel,
            grayscale,
        }
    }
}

// ───────────────────────── Stage 1: Grayscaled ───────────────────────

/// Pipeline state after grayscale reduction.
///
/// Call [`smooth`](Self::smooth) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .smooth() to continue"]
pub struct Grayscaled {
    config: CannyConfig,
    kernel: Kernel,
    grayscale: Raster,
}

impl Grayscaled {
    /// The grayscale raster.
    #[must_use]
    pub const fn grayscaled(&self) -> &Raster {
        &self.grayscale
    }

    /// Convolve with the Gaussian kernel and advance to [`Smoothed`].
    pub fn smooth(self) -> Smoothed {
        let smoothed = convolve(&self.grayscale, &self.kernel, self.config.boundary);
        log::debug!(
            "smooth: sigma={} kernel_sum={:.4} boundary={:?}",
            self.config.sigma,
            self.kernel.sum(),
            self.config.boundary,
        );
        Smoothed {
            config: self.config,
            kernel: self.kernel,
            grayscale: self.grayscale,
            smoothed,
        }
    }
}

// ───────────────────────── Stage 2: Smoothed ─────────────────────────

/// Pipeline state after Gaussian smoothing.
///
/// Call [`compute_gradients`](Self::compute_gradients) to advance to the
/// next stage.
#[must_use = "pipeline stages are consumed by advancing; call .compute_gradients() to continue"]
#[allow(clippy::struct_field_names)]
pub struct Smoothed {
    config: CannyConfig,
    kernel: Kernel,
    grayscale: Raster,
    smoothed: Raster,
}

impl Smoothed {
    /// The smoothed raster.
    #[must_use]
    pub const fn smoothed(&self) -> &Raster {
        &self.smoothed
    }

    /// The Gaussian kernel that produced [`smoothed`](Self::smoothed).
    #[must_use]
    pub const fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Run both Sobel kernels and advance to [`GradientsComputed`].
    pub fn compute_gradients(self) -> GradientsComputed {
        let gradients = crate::gradient::gradients(&self.smoothed, self.config.boundary);
        GradientsComputed {
            config: self.config,
            grayscale: self.grayscale,
            smoothed: self.smoothed,
            gradients,
        }
    }
}

// ───────────────────────── Stage 3: GradientsComputed ────────────────

/// Pipeline state after gradient estimation.
///
/// Call [`suppress`](Self::suppress) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .suppress() to continue"]
pub struct GradientsComputed {
    config: CannyConfig,
    grayscale: Raster,
    smoothed: Raster,
    gradients: Gradients,
}

impl GradientsComputed {
    /// Derivatives, magnitude, and quantized direction.
    #[must_use]
    pub const fn gradients(&self) -> &Gradients {
        &self.gradients
    }

    /// Thin the magnitude ridges and advance to [`Suppressed`].
    pub fn suppress(self) -> Suppressed {
        // Both rasters come out of the same gradient pass.
        let suppressed =
            crate::suppress::thin(&self.gradients.magnitude, &self.gradients.direction);
        Suppressed {
            config: self.config,
            grayscale: self.grayscale,
            smoothed: self.smoothed,
            gradients: self.gradients,
            suppressed,
        }
    }
}

// ───────────────────────── Stage 4: Suppressed ───────────────────────

/// Pipeline state after non-maximal suppression.
///
/// Call [`link`](Self::link) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .link() to continue"]
#[allow(clippy::struct_field_names)]
pub struct Suppressed {
    config: CannyConfig,
    grayscale: Raster,
    smoothed: Raster,
    gradients: Gradients,
    suppressed: Raster,
}

impl Suppressed {
    /// The thinned magnitude raster.
    #[must_use]
    pub const fn suppressed(&self) -> &Raster {
        &self.suppressed
    }

    /// Run hysteresis linking and advance to [`EdgesLinked`].
    pub fn link(self) -> EdgesLinked {
        let linked = crate::hysteresis::hysteresis(
            &self.suppressed,
            self.config.low_threshold,
            self.config.high_threshold,
        );
        EdgesLinked {
            config: self.config,
            grayscale: self.grayscale,
            smoothed: self.smoothed,
            gradients: self.gradients,
            suppressed: self.suppressed,
            linked,
        }
    }
}

// ───────────────────────── Stage 5: EdgesLinked ──────────────────────

/// Pipeline state after hysteresis linking, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct EdgesLinked {
    config: CannyConfig,
    grayscale: Raster,
    smoothed: Raster,
    gradients: Gradients,
    suppressed: Raster,
    linked: Linked,
}

impl EdgesLinked {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &Raster {
        &self.linked.edges
    }

    /// Hysteresis propagation passes executed.
    #[must_use]
    pub const fn passes(&self) -> u32 {
        self.linked.passes
    }

    /// Whether hysteresis reached a fixed point before the pass cap.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.linked.converged
    }

    /// Image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.linked.edges)
    }

    /// Consume the stage and return only the hysteresis output.
    #[must_use]
    pub fn into_linked(self) -> Linked {
        self.linked
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let dimensions = self.dimensions();
        StagedResult {
            grayscale: self.grayscale,
            smoothed: self.smoothed,
            gradients: self.gradients,
            suppressed: self.suppressed,
            edges: self.linked.edges,
            passes: self.linked.passes,
            converged: self.linked.converged,
            dimensions,
        }
    }
}

// ──────────────────────── PipelineStage trait ────────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 6;

/// Trait implemented by every pipeline stage.
///
/// Lets diagnostics time a stage transition and then describe the state
/// it produced without knowing which concrete stage it holds.
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"smooth"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `5` for
    /// `EdgesLinked`).
    const INDEX: usize;

    /// Stage-specific metrics describing the work done to reach this
    /// state.
    fn metrics(&self) -> StageMetrics;
}

impl<I, P> PipelineStage for Pending<'_, I>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    const NAME: &'static str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> StageMetrics {
        let (width, height) = self.source.dimensions();
        StageMetrics::Source {
            width,
            height,
            pixel_count: u64::from(width) * u64::from(height),
        }
    }
}

impl PipelineStage for Grayscaled {
    const NAME: &str = "grayscale";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Grayscale {
            width: self.grayscale.width(),
            height: self.grayscale.height(),
        }
    }
}

impl PipelineStage for Smoothed {
    const NAME: &str = "smooth";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Smooth {
            sigma: self.config.sigma,
            kernel_sum: self.kernel.sum(),
            boundary: self.config.boundary,
        }
    }
}

impl PipelineStage for GradientsComputed {
    const NAME: &str = "gradients";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        let magnitude = &self.gradients.magnitude;
        StageMetrics::Gradient {
            max_magnitude: magnitude.pixels().map(|p| p.0[0]).max().unwrap_or(0),
            nonzero_magnitude_count: count_nonzero_pixels(magnitude),
            total_pixel_count: self.gradients.dimensions().pixel_count(),
        }
    }
}

impl PipelineStage for Suppressed {
    const NAME: &str = "suppress";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        let before = count_nonzero_pixels(&self.gradients.magnitude);
        let retained_count = count_nonzero_pixels(&self.suppressed);
        StageMetrics::Suppression {
            retained_count,
            zeroed_count: before.saturating_sub(retained_count),
        }
    }
}

impl PipelineStage for EdgesLinked {
    const NAME: &str = "hysteresis";
    const INDEX: usize = 5;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Hysteresis {
            low_threshold: self.config.low_threshold,
            high_threshold: self.config.high_threshold,
            passes: self.linked.passes,
            converged: self.linked.converged,
            edge_pixel_count: count_edge_pixels(&self.linked.edges),
            total_pixel_count: self.dimensions().pixel_count(),
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental Canny edge detector.
///
/// Created via [`Pipeline::new`], which validates the config and builds
/// the smoothing kernel without touching the image. The caller then
/// chains stage methods to advance through the pipeline:
///
/// ```rust
/// # use edgemap_pipeline::{CannyConfig, EdgeError, Pipeline};
/// # fn run(image: &image::RgbImage) -> Result<(), EdgeError> {
/// let edges = Pipeline::new(image, CannyConfig::default())?
///     .grayscale()
///     .smooth()
///     .compute_gradients()
///     .suppress()
///     .link();
/// println!("{} passes", edges.passes());
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over `image` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidSigma`] or
    /// [`EdgeError::InvalidThresholdRange`] if `config` fails
    /// [`CannyConfig::validate`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new<I, P>(image: &I, config: CannyConfig) -> Result<Pending<'_, I>, EdgeError>
    where
        I: GenericImageView<Pixel = P>,
        P: Pixel<Subpixel = u8>,
    {
        config.validate()?;
        let kernel = Kernel::gaussian(config.sigma)?;
        Ok(Pending {
            config,
            kernel,
            source: image,
        })
    }
}
