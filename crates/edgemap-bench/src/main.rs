//! edgemap-bench: CLI tool for edge pipeline experimentation and diagnostics.
//!
//! Runs the Canny or plain-Sobel pipeline on a given image file with
//! configurable parameters, printing detailed per-stage diagnostics.
//! Useful for:
//!
//! - Tuning the Canny thresholds and smoothing sigma
//! - Comparing boundary policies on border-heavy images
//! - Measuring per-stage durations to identify bottlenecks
//! - Spotting hysteresis runs that hit the pass cap
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin edgemap-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage log lines from the pipeline.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use edgemap_pipeline::diagnostics::{CannyDiagnostics, Clock, SobelDiagnostics};
use edgemap_pipeline::{BoundaryPolicy, CannyConfig, Raster};

/// Edge pipeline experimentation and diagnostics for edgemap.
///
/// Runs an edge detector on a given image with configurable parameters
/// and prints detailed per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "edgemap-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Edge detector to run.
    #[arg(long, value_enum, default_value_t = Algorithm::Canny)]
    algorithm: Algorithm,

    /// Gaussian smoothing sigma (Canny only).
    #[arg(long, default_value_t = CannyConfig::DEFAULT_SIGMA)]
    sigma: f32,

    /// Low hysteresis threshold (Canny only).
    #[arg(long, default_value_t = CannyConfig::DEFAULT_LOW_THRESHOLD)]
    low: u8,

    /// High hysteresis threshold (Canny only).
    #[arg(long, default_value_t = CannyConfig::DEFAULT_HIGH_THRESHOLD)]
    high: u8,

    /// How convolution treats kernel taps outside the image.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_BOUNDARY)]
    boundary: Boundary,

    /// Full Canny config as a JSON string.
    ///
    /// When provided, `--sigma`, `--low`, `--high` and `--boundary` are
    /// ignored. The JSON must be a valid `CannyConfig` serialization;
    /// missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the edge map as PNG to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Invert the edge map before writing it.
    #[arg(long)]
    invert: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,
}

/// Edge detector selection.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// Smoothing, gradients, suppression and hysteresis.
    Canny,
    /// Summed directional Sobel responses.
    Sobel,
}

/// Boundary policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Boundary {
    /// End the kernel row at the first out-of-range tap.
    Truncate,
    /// Read out-of-range samples as zero.
    Zero,
    /// Clamp to the nearest edge sample.
    Extend,
    /// Wrap around the opposite edge.
    Wrap,
}

impl From<Boundary> for BoundaryPolicy {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::Truncate => Self::Truncate,
            Boundary::Zero => Self::Zero,
            Boundary::Extend => Self::Extend,
            Boundary::Wrap => Self::Wrap,
        }
    }
}

/// Must agree with [`BoundaryPolicy::default`].
const CLI_DEFAULT_BOUNDARY: Boundary = Boundary::Truncate;

/// Build a [`CannyConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags. Either way the result is
/// validated here so bad input fails before the image is read.
fn config_from_cli(cli: &Cli) -> Result<CannyConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        CannyConfig {
            sigma: cli.sigma,
            low_threshold: cli.low,
            high_threshold: cli.high,
            boundary: cli.boundary.into(),
        }
    };
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// Diagnostics from one run of either detector.
enum RunDiagnostics {
    Canny(CannyDiagnostics),
    Sobel(SobelDiagnostics),
}

impl RunDiagnostics {
    fn report(&self) -> String {
        match self {
            Self::Canny(d) => d.report(),
            Self::Sobel(d) => d.report(),
        }
    }

    fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Canny(d) => serde_json::to_string_pretty(d),
            Self::Sobel(d) => serde_json::to_string_pretty(d),
        }
    }

    const fn total_duration(&self) -> Duration {
        match self {
            Self::Canny(d) => d.total_duration,
            Self::Sobel(d) => d.total_duration,
        }
    }

    fn stage_durations(&self) -> Vec<(&'static str, Duration)> {
        match self {
            Self::Canny(d) => vec![
                ("Grayscale", d.grayscale.duration),
                ("Smooth", d.smooth.duration),
                ("Gradient", d.gradient.duration),
                ("Suppression", d.suppression.duration),
                ("Hysteresis", d.hysteresis.duration),
            ],
            Self::Sobel(d) => vec![
                ("Grayscale", d.grayscale.duration),
                ("Sobel", d.sobel.duration),
            ],
        }
    }
}

/// Run the selected detector once.
fn run_once(
    image: &image::DynamicImage,
    algorithm: Algorithm,
    config: CannyConfig,
) -> Result<(Raster, RunDiagnostics), String> {
    match algorithm {
        Algorithm::Canny => {
            let (staged, diagnostics) =
                edgemap_pipeline::diagnostics::canny_with_diagnostics(image, &config, &StdClock)
                    .map_err(|e| format!("Pipeline error: {e}"))?;
            if !staged.converged {
                log::warn!(
                    "hysteresis stopped at the pass cap; weak edges far from strong ones were dropped"
                );
            }
            Ok((staged.edges, RunDiagnostics::Canny(diagnostics)))
        }
        Algorithm::Sobel => {
            let (response, diagnostics) = edgemap_pipeline::diagnostics::sobel_with_diagnostics(
                image,
                config.boundary,
                &StdClock,
            );
            Ok((response, RunDiagnostics::Sobel(diagnostics)))
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match image::open(&cli.image_path) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        image.width(),
        image.height(),
    );
    if cli.algorithm == Algorithm::Canny {
        eprintln!("Config: {config:#?}");
    } else {
        eprintln!("Boundary: {:?}", config.boundary);
    }
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (edges, diagnostics) = match run_once(&image, cli.algorithm, config) {
            Ok(result) => result,
            Err(msg) => {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            match diagnostics.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write the edge map on the first run only.
        if run == 0
            && let Some(ref output_path) = cli.output
        {
            match write_edge_map(edges, output_path, cli.invert) {
                Ok(()) => eprintln!("Edge map written to {}", output_path.display()),
                Err(msg) => {
                    eprintln!("{msg}");
                    return ExitCode::FAILURE;
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Save `edges` as PNG, inverting it first when asked.
fn write_edge_map(edges: Raster, path: &Path, invert: bool) -> Result<(), String> {
    let edges = if invert {
        edgemap_pipeline::invert_edge_map(&edges)
    } else {
        edges
    };
    edges
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration().as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means. Every run used the same detector, so the stage
    // lists line up index by index.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let per_run: Vec<_> = all_diagnostics
        .iter()
        .map(RunDiagnostics::stage_durations)
        .collect();
    for (index, (name, _)) in first.stage_durations().iter().enumerate() {
        let stage_durations: Vec<f64> = per_run
            .iter()
            .filter_map(|stages| stages.get(index))
            .map(|(_, dur)| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
