//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! threshold tuning and boundary-policy experiments. The library never
//! reads a system clock itself: callers pass a [`Clock`], so the same
//! code runs natively, in tests with a fake clock, or anywhere else a
//! monotonic timer exists.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::{GenericImageView, Pixel};
use serde::{Deserialize, Serialize};

use crate::convolve::BoundaryPolicy;
use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{CannyConfig, Dimensions, EdgeError, Raster, StagedResult};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single Canny run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannyDiagnostics {
    /// Stage 1: grayscale reduction.
    pub grayscale: StageDiagnostics,
    /// Stage 2: Gaussian smoothing.
    pub smooth: StageDiagnostics,
    /// Stage 3: Sobel gradients and direction quantization.
    pub gradient: StageDiagnostics,
    /// Stage 4: non-maximal suppression.
    pub suppression: StageDiagnostics,
    /// Stage 5: hysteresis linking.
    pub hysteresis: StageDiagnostics,
    /// Total wall-clock duration, including config validation (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Source image dimensions.
    pub dimensions: Dimensions,
}

/// Diagnostics collected from a single plain-Sobel run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SobelDiagnostics {
    /// Grayscale reduction.
    pub grayscale: StageDiagnostics,
    /// Both directional convolutions and their sum.
    pub sobel: StageDiagnostics,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Source image dimensions.
    pub dimensions: Dimensions,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
///
/// Each variant captures the counts and sizes meaningful for that
/// particular processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// The untouched source image.
    Source {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Grayscale reduction metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Gaussian smoothing metrics.
    Smooth {
        /// Sigma used to build the kernel.
        sigma: f32,
        /// Sum of the unnormalized kernel weights (the convolution divisor).
        kernel_sum: f32,
        /// Boundary policy used for the convolution.
        boundary: BoundaryPolicy,
    },
    /// Gradient estimation metrics.
    Gradient {
        /// Largest gradient magnitude.
        max_magnitude: u8,
        /// Pixels with a non-zero magnitude.
        nonzero_magnitude_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
    /// Non-maximal suppression metrics.
    Suppression {
        /// Non-zero magnitudes that survived.
        retained_count: u64,
        /// Non-zero magnitudes that were zeroed.
        zeroed_count: u64,
    },
    /// Hysteresis linking metrics.
    Hysteresis {
        /// Low threshold.
        low_threshold: u8,
        /// High threshold.
        high_threshold: u8,
        /// Propagation passes executed.
        passes: u32,
        /// Whether propagation reached a fixed point before the pass cap.
        converged: bool,
        /// Number of edge pixels (value == 255) in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Plain-Sobel metrics.
    Sobel {
        /// Boundary policy used for both convolutions.
        boundary: BoundaryPolicy,
        /// Largest summed response.
        max_response: u8,
        /// Pixels with a non-zero response.
        nonzero_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
}

impl CannyDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        render_report(
            "Canny Diagnostics Report",
            self.dimensions,
            self.total_duration,
            &[
                ("Grayscale", &self.grayscale),
                ("Smooth", &self.smooth),
                ("Gradient", &self.gradient),
                ("Suppression", &self.suppression),
                ("Hysteresis", &self.hysteresis),
            ],
        )
    }
}

impl SobelDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        render_report(
            "Sobel Diagnostics Report",
            self.dimensions,
            self.total_duration,
            &[("Grayscale", &self.grayscale), ("Sobel", &self.sobel)],
        )
    }
}

/// Shared layout of both reports: header, then one row per stage.
fn render_report(
    title: &str,
    dimensions: Dimensions,
    total: Duration,
    stages: &[(&str, &StageDiagnostics)],
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{title}\n{}", "=".repeat(60)));
    lines.push(format!(
        "Image: {dimensions} ({} pixels)",
        dimensions.pixel_count(),
    ));
    lines.push(format!("Total duration: {:.3}ms", duration_ms(total)));
    lines.push(String::new());

    lines.push(format!(
        "{:<24} {:>10} {:>10}  {}",
        "Stage", "Duration", "% Total", "Details"
    ));
    lines.push("-".repeat(80));

    let total_ms = duration_ms(total);
    for (name, diag) in stages {
        let ms = duration_ms(diag.duration);
        let pct = if total_ms > 0.0 {
            ms / total_ms * 100.0
        } else {
            0.0
        };
        let details = format_metrics(&diag.metrics);
        lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
    }

    lines.join("\n")
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Percentage of `count` in `total`, or 0 for an empty image.
#[allow(clippy::cast_precision_loss)]
fn density(count: u64, total: u64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Source {
            width,
            height,
            pixel_count,
        } => format!("{width}x{height} ({pixel_count} pixels)"),
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Smooth {
            sigma,
            kernel_sum,
            boundary,
        } => format!("sigma={sigma:.2} sum={kernel_sum:.4} boundary={boundary:?}"),
        StageMetrics::Gradient {
            max_magnitude,
            nonzero_magnitude_count,
            total_pixel_count,
        } => format!(
            "max={max_magnitude} nonzero={nonzero_magnitude_count} ({:.1}%)",
            density(*nonzero_magnitude_count, *total_pixel_count),
        ),
        StageMetrics::Suppression {
            retained_count,
            zeroed_count,
        } => format!("kept={retained_count} zeroed={zeroed_count}"),
        StageMetrics::Hysteresis {
            low_threshold,
            high_threshold,
            passes,
            converged,
            edge_pixel_count,
            total_pixel_count,
        } => {
            let cap = if *converged { "" } else { " (pass cap hit)" };
            format!(
                "low={low_threshold} high={high_threshold} passes={passes}{cap} edges={edge_pixel_count} ({:.1}%)",
                density(*edge_pixel_count, *total_pixel_count),
            )
        }
        StageMetrics::Sobel {
            boundary,
            max_response,
            nonzero_count,
            total_pixel_count,
        } => format!(
            "boundary={boundary:?} max={max_response} nonzero={nonzero_count} ({:.1}%)",
            density(*nonzero_count, *total_pixel_count),
        ),
    }
}

/// Count edge pixels (value == 255) in a grayscale image.
pub(crate) fn count_edge_pixels(image: &Raster) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}

/// Count pixels with any non-zero value.
pub(crate) fn count_nonzero_pixels(image: &Raster) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] != 0)))
        .sum()
}

/// Run `step` under `clock` and describe the stage it produced.
fn timed<C: Clock, S: PipelineStage>(clock: &C, step: impl FnOnce() -> S) -> (S, StageDiagnostics) {
    let start = clock.now();
    let stage = step();
    let duration = clock.elapsed(&start);
    log::debug!("{} took {:.3}ms", S::NAME, duration_ms(duration));
    let metrics = stage.metrics();
    (stage, StageDiagnostics { duration, metrics })
}

/// Run the full Canny pipeline, collecting per-stage diagnostics.
///
/// Produces the same [`StagedResult`] as driving
/// [`Pipeline`] by hand.
///
/// # Errors
///
/// Returns [`EdgeError`] if `config` fails validation.
pub fn canny_with_diagnostics<I, P, C>(
    image: &I,
    config: &CannyConfig,
    clock: &C,
) -> Result<(StagedResult, CannyDiagnostics), EdgeError>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
    C: Clock,
{
    let total_start = clock.now();
    let pending = Pipeline::new(image, *config)?;
    let (width, height) = image.dimensions();

    let (stage, grayscale) = timed(clock, || pending.grayscale());
    let (stage, smooth) = timed(clock, || stage.smooth());
    let (stage, gradient) = timed(clock, || stage.compute_gradients());
    let (stage, suppression) = timed(clock, || stage.suppress());
    let (stage, hysteresis) = timed(clock, || stage.link());
    let result = stage.into_result();

    let diagnostics = CannyDiagnostics {
        grayscale,
        smooth,
        gradient,
        suppression,
        hysteresis,
        total_duration: clock.elapsed(&total_start),
        dimensions: Dimensions { width, height },
    };
    Ok((result, diagnostics))
}

/// Run the plain-Sobel pipeline, collecting per-stage diagnostics.
///
/// Returns the same raster as [`sobel`](crate::sobel).
#[must_use = "returns the Sobel response and its diagnostics"]
pub fn sobel_with_diagnostics<I, P, C>(
    image: &I,
    boundary: BoundaryPolicy,
    clock: &C,
) -> (Raster, SobelDiagnostics)
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
    C: Clock,
{
    let total_start = clock.now();

    let start = clock.now();
    let gray = crate::grayscale::to_grayscale(image);
    let grayscale = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Grayscale {
            width: gray.width(),
            height: gray.height(),
        },
    };

    let start = clock.now();
    let response = crate::edge::sobel_response(&gray, boundary);
    let duration = clock.elapsed(&start);
    let dimensions = Dimensions::of(&response);
    let sobel = StageDiagnostics {
        duration,
        metrics: StageMetrics::Sobel {
            boundary,
            max_response: response.pixels().map(|p| p.0[0]).max().unwrap_or(0),
            nonzero_count: count_nonzero_pixels(&response),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let diagnostics = SobelDiagnostics {
        grayscale,
        sobel,
        total_duration: clock.elapsed(&total_start),
        dimensions,
    };
    (response, diagnostics)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use image::{Luma, Rgb, RgbImage};

    use super::*;

    /// Clock that advances by one millisecond on every reading.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl TickClock {
        const fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn sharp_edge_image() -> RgbImage {
        RgbImage::from_fn(24, 16, |x, _| {
            if x < 12 {
                Rgb([0, 0, 0])
            } else {
                Rgb([200, 200, 200])
            }
        })
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn count_edge_pixels_works() {
        let mut img = Raster::new(10, 10);
        for i in 0..5 {
            img.put_pixel(i, 0, Luma([255]));
        }
        img.put_pixel(9, 9, Luma([254]));
        assert_eq!(count_edge_pixels(&img), 5);
        assert_eq!(count_nonzero_pixels(&img), 6);
    }

    #[test]
    fn density_of_empty_image_is_zero() {
        assert!(density(0, 0).abs() < f64::EPSILON);
        assert!((density(1, 4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn canny_diagnostics_match_pipeline() {
        let img = sharp_edge_image();
        let config = CannyConfig::default();
        let (result, diag) = canny_with_diagnostics(&img, &config, &TickClock::new()).unwrap();
        assert_eq!(result.edges, crate::canny(&img, &config).unwrap());
        assert_eq!(
            diag.dimensions,
            Dimensions {
                width: 24,
                height: 16
            }
        );
        assert_eq!(
            diag.hysteresis.metrics,
            StageMetrics::Hysteresis {
                low_threshold: 25,
                high_threshold: 70,
                passes: result.passes,
                converged: result.converged,
                edge_pixel_count: count_edge_pixels(&result.edges),
                total_pixel_count: 384,
            }
        );
    }

    #[test]
    fn fake_clock_durations_are_recorded() {
        let img = sharp_edge_image();
        let (_, diag) =
            canny_with_diagnostics(&img, &CannyConfig::default(), &TickClock::new()).unwrap();
        // Each stage reads the clock twice, one tick apart.
        for stage in [
            &diag.grayscale,
            &diag.smooth,
            &diag.gradient,
            &diag.suppression,
            &diag.hysteresis,
        ] {
            assert_eq!(stage.duration, Duration::from_millis(1));
        }
        assert!(diag.total_duration > Duration::from_millis(5));
    }

    #[test]
    fn canny_diagnostics_reject_invalid_config() {
        let config = CannyConfig {
            sigma: 0.0,
            ..CannyConfig::default()
        };
        let result = canny_with_diagnostics(&sharp_edge_image(), &config, &TickClock::new());
        assert!(matches!(result, Err(EdgeError::InvalidSigma(_))));
    }

    #[test]
    fn sobel_diagnostics_match_sobel() {
        let img = sharp_edge_image();
        let (response, diag) =
            sobel_with_diagnostics(&img, BoundaryPolicy::Extend, &TickClock::new());
        assert_eq!(response, crate::sobel(&img, BoundaryPolicy::Extend));
        assert!(matches!(
            diag.sobel.metrics,
            StageMetrics::Sobel {
                boundary: BoundaryPolicy::Extend,
                max_response: 255,
                total_pixel_count: 384,
                ..
            }
        ));
    }

    #[test]
    fn canny_report_lists_every_stage() {
        let (_, diag) =
            canny_with_diagnostics(&sharp_edge_image(), &CannyConfig::default(), &TickClock::new())
                .unwrap();
        let report = diag.report();
        assert!(report.contains("Canny Diagnostics Report"));
        assert!(report.contains("Image: 24x16 (384 pixels)"));
        for name in ["Grayscale", "Smooth", "Gradient", "Suppression", "Hysteresis"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("low=25 high=70"));
    }

    #[test]
    fn sobel_report_lists_both_stages() {
        let (_, diag) = sobel_with_diagnostics(
            &sharp_edge_image(),
            BoundaryPolicy::Truncate,
            &TickClock::new(),
        );
        let report = diag.report();
        assert!(report.contains("Sobel Diagnostics Report"));
        assert!(report.contains("boundary=Truncate"));
    }

    #[test]
    fn pass_cap_is_flagged_in_report() {
        let text = format_metrics(&StageMetrics::Hysteresis {
            low_threshold: 10,
            high_threshold: 20,
            passes: 100,
            converged: false,
            edge_pixel_count: 5,
            total_pixel_count: 10,
        });
        assert_eq!(
            text,
            "low=10 high=20 passes=100 (pass cap hit) edges=5 (50.0%)"
        );
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let diag = StageDiagnostics {
            duration: Duration::from_millis(1500),
            metrics: StageMetrics::Grayscale {
                width: 2,
                height: 3,
            },
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert!((json["duration"].as_f64().unwrap() - 1.5).abs() < 1e-9);
        let back: StageDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
        assert_eq!(back.metrics, diag.metrics);
    }

    #[test]
    fn negative_duration_rejected() {
        let json = r#"{"duration": -1.0, "metrics": {"Grayscale": {"width": 1, "height": 1}}}"#;
        assert!(serde_json::from_str::<StageDiagnostics>(json).is_err());
    }
}
