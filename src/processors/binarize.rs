//! Page binarization.
//!
//! Field detection uses a local mean threshold: every pixel is compared with
//! the mean of its `block_size x block_size` neighborhood minus a constant.
//! Checkbox detection and region cleaning use a global Otsu threshold instead,
//! because a local mean erases the interior of large filled glyphs.

use image::{GrayImage, RgbImage};
use imageproc::contrast::otsu_level;
use tracing::debug;

use crate::core::config::{ParameterSet, coerce_block_size, validate_block_size};
use crate::core::errors::FormResult;

/// Local adaptive mean thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveThreshold {
    block_size: u32,
    constant: i32,
}

impl AdaptiveThreshold {
    /// Creates a thresholder, rejecting block sizes that are even or below 3.
    pub fn new(block_size: u32, constant: i32) -> FormResult<Self> {
        validate_block_size(block_size)?;
        Ok(Self {
            block_size,
            constant,
        })
    }

    /// Creates a thresholder, replacing an invalid block size by the nearest valid one.
    pub fn coerced(block_size: u32, constant: i32) -> Self {
        Self {
            block_size: coerce_block_size(block_size),
            constant,
        }
    }

    /// Creates the thresholder described by a segmentation parameter set.
    pub fn from_params(params: &ParameterSet) -> FormResult<Self> {
        Self::new(params.block_size, params.constant)
    }

    /// The neighborhood side length.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Converts a color page to grayscale and thresholds it.
    pub fn apply_rgb(&self, image: &RgbImage) -> GrayImage {
        self.apply(&to_gray(image))
    }

    /// Thresholds a grayscale image. Pixels brighter than their local
    /// threshold become 255 and everything else 0, so paper is foreground.
    ///
    /// Neighborhoods are clipped at the image border, so edge pixels are
    /// compared with the mean of the part of the window inside the image.
    pub fn apply(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = gray.dimensions();
        let (w, h) = (w as usize, h as usize);
        let mut output = GrayImage::new(w as u32, h as u32);
        if w == 0 || h == 0 {
            return output;
        }

        let pixels = gray.as_raw();
        let integral = integral_image(pixels, w, h);
        let iw = w + 1;
        let half = (self.block_size / 2) as usize;
        let c = self.constant as f64;

        let out = output.as_mut();
        for y in 0..h {
            let y0 = y.saturating_sub(half);
            let y1 = (y + half).min(h - 1) + 1;
            for x in 0..w {
                let x0 = x.saturating_sub(half);
                let x1 = (x + half).min(w - 1) + 1;

                let area = ((y1 - y0) * (x1 - x0)) as f64;
                let sum = integral[y1 * iw + x1] - integral[y0 * iw + x1] - integral[y1 * iw + x0]
                    + integral[y0 * iw + x0];
                let threshold = sum as f64 / area - c;

                out[y * w + x] = if pixels[y * w + x] as f64 > threshold { 255 } else { 0 };
            }
        }

        debug!(
            block_size = self.block_size,
            constant = self.constant,
            "adaptive threshold applied to {}x{} image",
            w,
            h
        );
        output
    }
}

/// Summed-area table with a zero border row and column.
fn integral_image(pixels: &[u8], w: usize, h: usize) -> Vec<i64> {
    let iw = w + 1;
    let mut integral = vec![0i64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0i64;
        for x in 0..w {
            row_sum += pixels[y * w + x] as i64;
            integral[(y + 1) * iw + (x + 1)] = row_sum + integral[y * iw + (x + 1)];
        }
    }
    integral
}

/// Converts a color image to 8-bit luminance.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Global Otsu threshold with ink (dark pixels) as foreground.
///
/// Output pixels are 255 where the input is at or below the Otsu level.
pub fn otsu_inverted(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut output = gray.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = if pixel[0] <= level { 255 } else { 0 };
    }
    output
}
