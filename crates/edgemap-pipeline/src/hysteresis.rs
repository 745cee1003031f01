//! Double-threshold hysteresis linking.
//!
//! Turns a thinned magnitude raster into a binary edge map in two
//! phases:
//!
//! 1. **Seeding.** Every pixel is classified against the thresholds.
//!    [`PixelClass::Strong`] pixels become edges immediately,
//!    [`PixelClass::Suppressed`] pixels never do, and interior
//!    [`PixelClass::Weak`] pixels are left pending.
//! 2. **Propagation.** Repeated passes promote every pending pixel that
//!    has an 8-connected neighbour which was already an edge when the
//!    pass began. Promotions are collected during the pass and applied
//!    together at its end, so each pass extends edges by exactly one
//!    pixel regardless of scan order.
//!
//! Propagation stops at a fixed point or after
//! [`MAX_HYSTERESIS_PASSES`], whichever comes first. Pixels still
//! pending at that point are dropped.

use image::Luma;
use imageproc::definitions::{HasBlack, HasWhite};
use serde::{Deserialize, Serialize};

use crate::types::Raster;

/// Upper bound on propagation passes.
///
/// A chain of weak pixels longer than this is only linked up to this
/// many pixels away from its strong seed.
pub const MAX_HYSTERESIS_PASSES: u32 = 100;

/// Classification of a suppressed-magnitude sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelClass {
    /// At or above the high threshold: always an edge.
    Strong,
    /// Between the thresholds: an edge only if linked to one.
    Weak,
    /// Below the low threshold: never an edge.
    Suppressed,
}

/// Classify `value` against `low..high`.
///
/// `value >= high` is strong and `value < low` is suppressed, so with
/// `low == high` no value is weak.
#[must_use]
pub const fn classify(value: u8, low: u8, high: u8) -> PixelClass {
    if value >= high {
        PixelClass::Strong
    } else if value < low {
        PixelClass::Suppressed
    } else {
        PixelClass::Weak
    }
}

/// Output of [`hysteresis`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linked {
    /// Binary edge map: 255 for edges, 0 elsewhere.
    pub edges: Raster,
    /// Propagation passes executed.
    pub passes: u32,
    /// `false` when [`MAX_HYSTERESIS_PASSES`] cut propagation short.
    pub converged: bool,
}

/// Link the thinned magnitude raster into a binary edge map.
///
/// `low > high` is not rejected here; [`CannyConfig::validate`](crate::CannyConfig::validate)
/// guards the public entry points.
#[must_use = "returns the linked edge map"]
pub fn hysteresis(suppressed: &Raster, low: u8, high: u8) -> Linked {
    let (width, height) = suppressed.dimensions();
    let interior = |x: u32, y: u32| x > 0 && y > 0 && x + 1 < width && y + 1 < height;

    let mut edges = Raster::from_pixel(width, height, Luma::black());
    let mut pending = Vec::new();
    for (x, y, pixel) in suppressed.enumerate_pixels() {
        match classify(pixel.0[0], low, high) {
            PixelClass::Strong => edges.put_pixel(x, y, Luma::white()),
            PixelClass::Weak if interior(x, y) => pending.push((x, y)),
            PixelClass::Weak | PixelClass::Suppressed => {}
        }
    }
    let seeded = pending.len();

    let mut passes = 0;
    let mut converged = false;
    while passes < MAX_HYSTERESIS_PASSES {
        if pending.is_empty() {
            converged = true;
            break;
        }
        passes += 1;
        let (promoted, rest): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|&(x, y)| touches_edge(&edges, x, y));
        pending = rest;
        if promoted.is_empty() {
            converged = true;
            break;
        }
        for (x, y) in promoted {
            edges.put_pixel(x, y, Luma::white());
        }
    }
    // The cap may land exactly on the fixed point; leftovers that no
    // edge reaches would not change under another pass.
    converged |= !pending.iter().any(|&(x, y)| touches_edge(&edges, x, y));

    if converged {
        log::debug!(
            "hysteresis: {seeded} weak pixels, {} unlinked after {passes} passes",
            pending.len(),
        );
    } else {
        log::warn!(
            "hysteresis: stopped after {MAX_HYSTERESIS_PASSES} passes with {} weak pixels pending",
            pending.len(),
        );
    }

    Linked {
        edges,
        passes,
        converged,
    }
}

/// Whether any 8-connected neighbour of interior pixel `(x, y)` is an edge.
fn touches_edge(edges: &Raster, x: u32, y: u32) -> bool {
    (y - 1..=y + 1).any(|ny| {
        (x - 1..=x + 1).any(|nx| (nx, ny) != (x, y) && edges.get_pixel(nx, ny).0[0] == 255)
    })
}
