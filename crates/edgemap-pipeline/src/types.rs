//! Shared types for the edgemap pipeline.

use serde::{Deserialize, Serialize};

use crate::convolve::BoundaryPolicy;
use crate::gradient::Gradients;
use crate::kernel::Kernel;

/// Re-export `GrayImage` so downstream crates can reference raster
/// data without depending on `image` directly.
pub use image::GrayImage;

/// A single-channel 8-bit raster.
///
/// Every stage takes its input by reference and allocates a fresh
/// `Raster` of the same dimensions for its output. Samples are `u8`, so
/// the `[0, 255]` intensity range holds by construction.
pub type Raster = GrayImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing raster.
    #[must_use]
    pub fn of(raster: &Raster) -> Self {
        let (width, height) = raster.dimensions();
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Configuration for the Canny edge detector.
///
/// Defaults match the settings the detector has always been tuned
/// with: `sigma = 1.4`, thresholds `25..70`, and truncating boundary
/// handling.
///
/// # Invariants
///
/// `sigma` must be finite, strictly positive, and within the range where
/// [`Kernel::gaussian`] can build a normalizable kernel (roughly
/// `3.5e-19..200`). `low_threshold` must not exceed `high_threshold`. Fields are public; call
/// [`validate`](Self::validate) (the orchestrator always does) before
/// running any stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyConfig {
    /// Standard deviation of the 5x5 Gaussian smoothing kernel.
    pub sigma: f32,

    /// Suppressed magnitudes below this value are never edges.
    pub low_threshold: u8,

    /// Suppressed magnitudes at or above this value are definite edges.
    /// Values in `low_threshold..high_threshold` are edges only when
    /// linked to a definite edge.
    pub high_threshold: u8,

    /// How convolution treats kernel taps that fall outside the raster.
    pub boundary: BoundaryPolicy,
}

impl CannyConfig {
    /// Default Gaussian sigma.
    pub const DEFAULT_SIGMA: f32 = 1.4;
    /// Default low hysteresis threshold.
    pub const DEFAULT_LOW_THRESHOLD: u8 = 25;
    /// Default high hysteresis threshold.
    pub const DEFAULT_HIGH_THRESHOLD: u8 = 70;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`EdgeError::InvalidSigma`] if `sigma` is not a finite
    /// positive number or yields a degenerate smoothing kernel (see
    /// [`Kernel::gaussian`]). Returns [`EdgeError::InvalidThresholdRange`] if
    /// `low_threshold > high_threshold`.
    pub fn validate(&self) -> Result<(), EdgeError> {
        Kernel::gaussian(self.sigma)?;
        if self.low_threshold > self.high_threshold {
            return Err(EdgeError::InvalidThresholdRange {
                low: self.low_threshold,
                high: self.high_threshold,
            });
        }
        Ok(())
    }
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            sigma: Self::DEFAULT_SIGMA,
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            boundary: BoundaryPolicy::default(),
        }
    }
}

/// Every intermediate of a Canny run, in stage order.
///
/// Produced by [`EdgesLinked::into_result`](crate::pipeline::EdgesLinked::into_result).
/// `edges` equals what [`canny`](crate::canny) returns for the same
/// input and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedResult {
    /// Grayscale reduction of the source image.
    pub grayscale: Raster,
    /// Gaussian-smoothed grayscale.
    pub smoothed: Raster,
    /// Sobel derivatives, magnitude, and quantized direction.
    pub gradients: Gradients,
    /// Magnitude after non-maximal suppression.
    pub suppressed: Raster,
    /// Final binary edge map.
    pub edges: Raster,
    /// Hysteresis propagation passes executed.
    pub passes: u32,
    /// Whether hysteresis reached a fixed point before the pass cap.
    pub converged: bool,
    /// Dimensions shared by every raster above.
    pub dimensions: Dimensions,
}

/// Errors reported by the edge pipeline.
///
/// Every variant is a caller error detected before a stage produces
/// output. Nothing here is transient, so there is nothing to retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum EdgeError {
    /// Kernel dimensions are even or zero, or the weight count does not
    /// match `width * height`.
    #[error("invalid kernel shape: {width}x{height} with {len} weights (dimensions must be odd and non-zero)")]
    InvalidKernelShape {
        /// Requested kernel width.
        width: u32,
        /// Requested kernel height.
        height: u32,
        /// Number of weights supplied.
        len: usize,
    },

    /// The low hysteresis threshold is above the high one.
    #[error("invalid threshold range: low {low} > high {high}")]
    InvalidThresholdRange {
        /// Low threshold.
        low: u8,
        /// High threshold.
        high: u8,
    },

    /// The Gaussian sigma is zero, negative, not finite, or outside the
    /// range where the 5x5 kernel can be normalized.
    #[error("invalid sigma {0}: must be finite and greater than zero")]
    InvalidSigma(f32),

    /// Two rasters combined by a stage have different dimensions.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensions of the first input.
        expected: Dimensions,
        /// Dimensions of the offending input.
        actual: Dimensions,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Dimensions tests ---

    #[test]
    fn dimensions_of_raster() {
        let raster = Raster::new(13, 7);
        assert_eq!(
            Dimensions::of(&raster),
            Dimensions {
                width: 13,
                height: 7
            }
        );
        assert_eq!(Dimensions::of(&raster).pixel_count(), 91);
    }

    #[test]
    fn dimensions_display() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.to_string(), "640x480");
    }

    // --- CannyConfig tests ---

    #[test]
    fn canny_config_defaults() {
        let config = CannyConfig::default();
        assert!((config.sigma - 1.4).abs() < f32::EPSILON);
        assert_eq!(config.low_threshold, 25);
        assert_eq!(config.high_threshold, 70);
        assert_eq!(config.boundary, BoundaryPolicy::Truncate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_sigma_rejected() {
        let config = CannyConfig {
            sigma: 0.0,
            ..CannyConfig::default()
        };
        assert!(matches!(config.validate(), Err(EdgeError::InvalidSigma(_))));
    }

    #[test]
    fn negative_and_nan_sigma_rejected() {
        for sigma in [-1.0, f32::NAN, f32::INFINITY] {
            let config = CannyConfig {
                sigma,
                ..CannyConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(EdgeError::InvalidSigma(_))),
                "sigma {sigma} should be rejected",
            );
        }
    }

    #[test]
    fn sigma_outside_kernel_range_rejected() {
        for sigma in [250.0, 1e-25] {
            let config = CannyConfig {
                sigma,
                ..CannyConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(EdgeError::InvalidSigma(_))),
                "sigma {sigma} should be rejected",
            );
        }
        let config = CannyConfig {
            sigma: 150.0,
            ..CannyConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn low_above_high_rejected() {
        let config = CannyConfig {
            low_threshold: 80,
            high_threshold: 40,
            ..CannyConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(EdgeError::InvalidThresholdRange { low: 80, high: 40 })
        );
    }

    #[test]
    fn equal_thresholds_accepted() {
        let config = CannyConfig {
            low_threshold: 60,
            high_threshold: 60,
            ..CannyConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn canny_config_serde_round_trip() {
        let config = CannyConfig {
            sigma: 2.0,
            low_threshold: 10,
            high_threshold: 90,
            boundary: BoundaryPolicy::Wrap,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CannyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn canny_config_missing_fields_use_defaults() {
        let config: CannyConfig = serde_json::from_str(r#"{"high_threshold": 120}"#).unwrap();
        assert_eq!(config.high_threshold, 120);
        assert_eq!(config.low_threshold, CannyConfig::DEFAULT_LOW_THRESHOLD);
        assert_eq!(config.boundary, BoundaryPolicy::Truncate);
    }

    // --- EdgeError tests ---

    #[test]
    fn error_threshold_display() {
        let err = EdgeError::InvalidThresholdRange { low: 90, high: 10 };
        assert_eq!(err.to_string(), "invalid threshold range: low 90 > high 10");
    }

    #[test]
    fn error_dimension_mismatch_display() {
        let err = EdgeError::DimensionMismatch {
            expected: Dimensions {
                width: 4,
                height: 4,
            },
            actual: Dimensions {
                width: 4,
                height: 5,
            },
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4x4, got 4x5");
    }

    #[test]
    fn error_serde_round_trip() {
        let err = EdgeError::InvalidKernelShape {
            width: 4,
            height: 3,
            len: 12,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: EdgeError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
