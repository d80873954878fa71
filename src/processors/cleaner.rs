//! Removal of small ink marks from field crops before recognition.
//!
//! Ink is dilated first so that the strokes of real handwriting merge into
//! large blobs; whatever is still small after dilation is treated as noise
//! and painted white. The top-left corner of a crop usually holds the printed
//! field number and is never touched.

use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};
use tracing::debug;

use super::binarize::{otsu_inverted, to_gray};
use super::contours::ContourExtractor;
use super::geometry::Rect;
use super::morphology::dilate_square;
use super::types::RetrievalMode;
use crate::core::config::{CleanerParams, ConfigValidator};
use crate::core::errors::FormResult;
use crate::utils::{load_rgb, save_rgb};

/// Erases small connected ink marks from a crop.
#[derive(Debug, Clone, Copy)]
pub struct RegionCleaner {
    params: CleanerParams,
}

impl RegionCleaner {
    /// Creates a cleaner, rejecting a zero kernel or a negative area threshold.
    pub fn new(params: CleanerParams) -> FormResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters in use.
    pub fn params(&self) -> &CleanerParams {
        &self.params
    }

    /// The protected top-left corner of a `width x height` crop.
    pub fn ignore_region(width: u32, height: u32) -> Rect {
        Rect::new(0, 0, width / 8, height / 4)
    }

    /// Mask of the pixels to erase (255 = erase).
    pub fn noise_mask(&self, crop: &RgbImage) -> GrayImage {
        let (width, height) = crop.dimensions();
        let ink = otsu_inverted(&to_gray(crop));
        let dilated = dilate_square(&ink, self.params.kernel_size, self.params.iterations);
        let ignore = Self::ignore_region(width, height);

        let mut mask = GrayImage::new(width, height);
        let mut erased = 0usize;
        for contour in ContourExtractor::new(RetrievalMode::Tree).extract(&dilated) {
            if contour.is_hole
                || contour.area >= self.params.area_threshold
                || contour.rect.intersects(&ignore)
            {
                continue;
            }
            contour.polygon.fill_into(&mut mask, 255);
            erased += 1;
        }

        debug!(
            kernel_size = self.params.kernel_size,
            iterations = self.params.iterations,
            area_threshold = self.params.area_threshold,
            "marked {} noise blobs for removal",
            erased
        );
        mask
    }

    /// Returns a copy of `crop` with the noise pixels set to white.
    pub fn clean(&self, crop: &RgbImage) -> RgbImage {
        let mask = self.noise_mask(crop);
        let mut cleaned = crop.clone();
        for (pixel, m) in cleaned.pixels_mut().zip(mask.pixels()) {
            if m[0] > 0 {
                *pixel = Rgb([255, 255, 255]);
            }
        }
        cleaned
    }

    /// Cleans the image at `input` and writes the result to `output`.
    pub fn clean_file(&self, input: &Path, output: &Path) -> FormResult<()> {
        let crop = load_rgb(input)?;
        save_rgb(&self.clean(&crop), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint(img: &mut RgbImage, rect: Rect) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }

    fn noisy_field() -> RgbImage {
        let mut img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        paint(&mut img, Rect::new(100, 40, 60, 20)); // answer
        paint(&mut img, Rect::new(150, 80, 3, 3)); // speck
        paint(&mut img, Rect::new(5, 5, 3, 3)); // field number corner
        img
    }

    #[test]
    fn test_clean_removes_small_marks_outside_ignore_region() {
        let cleaner = RegionCleaner::new(CleanerParams::default()).unwrap();
        let cleaned = cleaner.clean(&noisy_field());
        assert_eq!(cleaned.get_pixel(151, 81), &Rgb([255, 255, 255]));
        assert_eq!(cleaned.get_pixel(120, 50), &Rgb([0, 0, 0]));
        assert_eq!(cleaned.get_pixel(6, 6), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zero_area_threshold_keeps_everything() {
        let cleaner = RegionCleaner::new(CleanerParams::new(3, 1, 0.0)).unwrap();
        let field = noisy_field();
        assert_eq!(cleaner.clean(&field), field);
    }

    #[test]
    fn test_rejects_zero_kernel() {
        assert!(RegionCleaner::new(CleanerParams::new(0, 1, 10.0)).is_err());
    }

    #[test]
    fn test_ignore_region() {
        assert_eq!(RegionCleaner::ignore_region(200, 100), Rect::new(0, 0, 25, 25));
    }

    #[test]
    fn test_clean_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        save_rgb(&noisy_field(), &input).unwrap();
        RegionCleaner::new(CleanerParams::default())
            .unwrap()
            .clean_file(&input, &output)
            .unwrap();
        let cleaned = load_rgb(&output).unwrap();
        assert_eq!(cleaned.get_pixel(151, 81), &Rgb([255, 255, 255]));
    }
}
