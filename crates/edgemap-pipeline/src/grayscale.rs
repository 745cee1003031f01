//! Grayscale reduction.
//!
//! Collapses any 8-bit image (gray, RGB, RGBA, ...) to a single
//! intensity channel. This is the first step of both edge pipelines:
//! image in, [`Raster`] out.

use image::{GenericImageView, Luma, Pixel};

use crate::types::Raster;

/// Reduce an 8-bit image to single-channel intensity.
///
/// Each output sample is the unweighted mean `(r + g + b) / 3` of the
/// pixel's RGB view, using integer division. Alpha is ignored. Gray
/// input expands to `(v, v, v)`, so reducing an already-gray raster
/// returns an equal raster.
#[must_use = "returns the grayscale raster"]
pub fn to_grayscale<I, P>(src: &I) -> Raster
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    Raster::from_fn(width, height, |x, y| {
        let [r, g, b] = src.get_pixel(x, y).to_rgb().0;
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        Luma([u8::try_from(sum / 3).unwrap_or(u8::MAX)])
    })
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn rgb_average_uses_integer_division() {
        let img = RgbImage::from_pixel(1, 1, Rgb([10, 20, 31]));
        // 61 / 3 = 20 (truncated).
        assert_eq!(to_grayscale(&img).get_pixel(0, 0).0[0], 20);
    }

    #[test]
    fn channels_weigh_equally() {
        let red = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        let green = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        let blue = RgbImage::from_pixel(1, 1, Rgb([0, 0, 255]));
        let r = to_grayscale(&red).get_pixel(0, 0).0[0];
        let g = to_grayscale(&green).get_pixel(0, 0).0[0];
        let b = to_grayscale(&blue).get_pixel(0, 0).0[0];
        assert_eq!((r, g, b), (85, 85, 85));
    }

    #[test]
    fn white_stays_white() {
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 255, 255]));
        assert!(to_grayscale(&img).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = RgbaImage::from_pixel(1, 1, Rgba([90, 60, 30, 255]));
        let clear = RgbaImage::from_pixel(1, 1, Rgba([90, 60, 30, 0]));
        assert_eq!(to_grayscale(&opaque), to_grayscale(&clear));
        assert_eq!(to_grayscale(&opaque).get_pixel(0, 0).0[0], 60);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbaImage::new(17, 31);
        assert_eq!(to_grayscale(&img).dimensions(), (17, 31));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn reduction_is_idempotent() {
        let img = RgbImage::from_fn(8, 8, |x, y| {
            Rgb([(x * 31) as u8, (y * 29) as u8, ((x + y) * 13) as u8])
        });
        let once = to_grayscale(&img);
        let twice = to_grayscale(&once);
        assert_eq!(once, twice);
    }
}
