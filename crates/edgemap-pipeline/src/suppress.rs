//! Non-maximal suppression: thin gradient ridges to one pixel.
//!
//! Each interior pixel is compared against the two neighbours lying
//! along its quantized gradient direction and zeroed unless it is at
//! least as large as both. Exact plateaus survive. Border pixels have
//! no full neighbourhood and are copied through unchanged.

use image::Luma;

use crate::gradient::DirectionMap;
use crate::types::{Dimensions, EdgeError, Raster};

/// Thin `magnitude` along `direction`.
///
/// # Errors
///
/// Returns [`EdgeError::DimensionMismatch`] if the two inputs do not
/// have the same width and height.
pub fn suppress(magnitude: &Raster, direction: &DirectionMap) -> Result<Raster, EdgeError> {
    let expected = Dimensions::of(magnitude);
    let (width, height) = direction.dimensions();
    let actual = Dimensions { width, height };
    if expected != actual {
        return Err(EdgeError::DimensionMismatch { expected, actual });
    }
    Ok(thin(magnitude, direction))
}

/// Suppression proper. Callers guarantee matching dimensions.
pub(crate) fn thin(magnitude: &Raster, direction: &DirectionMap) -> Raster {
    let (width, height) = magnitude.dimensions();
    let mut out = magnitude.clone();
    let mut suppressed = 0_u64;

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let centre = magnitude.get_pixel(x, y).0[0];
            let is_local_max = direction.get(x, y).neighbor_offsets().iter().all(|&(dx, dy)| {
                let nx = x.wrapping_add_signed(dx);
                let ny = y.wrapping_add_signed(dy);
                centre >= magnitude.get_pixel(nx, ny).0[0]
            });
            if !is_local_max {
                out.put_pixel(x, y, Luma([0]));
                suppressed += 1;
            }
        }
    }

    log::debug!("suppress: {width}x{height}, {suppressed} pixels zeroed");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gradient::AngleClass;

    /// 5x5 magnitude raster with a three-pixel-wide vertical ridge.
    fn ridge() -> Raster {
        Raster::from_fn(5, 5, |x, _| {
            Luma([match x {
                1 | 3 => 100,
                2 => 180,
                _ => 0,
            }])
        })
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let magnitude = Raster::new(5, 5);
        let direction = DirectionMap::uniform(5, 4, AngleClass::Deg0);
        let err = suppress(&magnitude, &direction).unwrap_err();
        assert_eq!(
            err,
            EdgeError::DimensionMismatch {
                expected: Dimensions {
                    width: 5,
                    height: 5
                },
                actual: Dimensions {
                    width: 5,
                    height: 4
                },
            }
        );
    }

    #[test]
    fn ridge_thinned_across_gradient() {
        let out = suppress(&ridge(), &DirectionMap::uniform(5, 5, AngleClass::Deg0)).unwrap();
        for y in 1..4 {
            assert_eq!(out.get_pixel(1, y).0[0], 0);
            assert_eq!(out.get_pixel(2, y).0[0], 180);
            assert_eq!(out.get_pixel(3, y).0[0], 0);
        }
    }

    #[test]
    fn ridge_kept_when_direction_runs_along_it() {
        // Comparing up/down along a vertical ridge finds equal values.
        let out = suppress(&ridge(), &DirectionMap::uniform(5, 5, AngleClass::Deg90)).unwrap();
        assert_eq!(out, ridge());
    }

    #[test]
    fn border_pixels_copied_unchanged() {
        let magnitude = Raster::from_fn(4, 4, |x, y| Luma([u8::try_from(x * 10 + y).unwrap()]));
        let out = suppress(&magnitude, &DirectionMap::uniform(4, 4, AngleClass::Deg0)).unwrap();
        for i in 0..4 {
            assert_eq!(out.get_pixel(i, 0), magnitude.get_pixel(i, 0));
            assert_eq!(out.get_pixel(i, 3), magnitude.get_pixel(i, 3));
            assert_eq!(out.get_pixel(0, i), magnitude.get_pixel(0, i));
            assert_eq!(out.get_pixel(3, i), magnitude.get_pixel(3, i));
        }
    }

    #[test]
    fn plateau_survives() {
        let magnitude = Raster::from_pixel(3, 3, Luma([77]));
        let out = suppress(&magnitude, &DirectionMap::uniform(3, 3, AngleClass::Deg45)).unwrap();
        assert_eq!(out.get_pixel(1, 1).0[0], 77);
    }

    #[test]
    fn diagonal_directions_use_diagonal_neighbours() {
        // Centre 50 with a larger value at (2, 2) only.
        let magnitude = Raster::from_fn(3, 3, |x, y| {
            Luma([match (x, y) {
                (1, 1) => 50,
                (2, 2) => 60,
                _ => 0,
            }])
        });
        let along_45 = suppress(&magnitude, &DirectionMap::uniform(3, 3, AngleClass::Deg45)).unwrap();
        assert_eq!(along_45.get_pixel(1, 1).0[0], 0);
        let along_135 =
            suppress(&magnitude, &DirectionMap::uniform(3, 3, AngleClass::Deg135)).unwrap();
        assert_eq!(along_135.get_pixel(1, 1).0[0], 50);
    }

    #[test]
    fn tiny_rasters_pass_through() {
        let magnitude = Raster::from_pixel(2, 1, Luma([9]));
        let out = suppress(&magnitude, &DirectionMap::uniform(2, 1, AngleClass::Deg0)).unwrap();
        assert_eq!(out, magnitude);
        let empty = Raster::new(0, 0);
        assert_eq!(
            suppress(&empty, &DirectionMap::uniform(0, 0, AngleClass::Deg0)).unwrap(),
            empty
        );
    }
}
