//! Morphological operations on binary masks.
//!
//! All operations use a square structuring element expressed as a Chebyshev
//! (`LInf`) radius: radius `r` is a `(2r + 1) x (2r + 1)` square.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Chebyshev radius of the square element that best matches `kernel_size`.
///
/// Odd sizes map exactly. An even size behaves like the next odd size up
/// (4 acts as 5), since a square element centered on a pixel always has an
/// odd side. Sizes 0 and 1 give radius 0, which leaves a mask unchanged.
pub fn kernel_radius(kernel_size: u32) -> u8 {
    (kernel_size / 2).min(u8::MAX as u32) as u8
}

/// Dilates `mask` with a `kernel_size` square element, `iterations` times.
pub fn dilate_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let radius = kernel_radius(kernel_size);
    let mut dilated = mask.clone();
    if radius == 0 {
        return dilated;
    }
    for _ in 0..iterations {
        dilated = morphology::dilate(&dilated, Norm::LInf, radius);
    }
    dilated
}

/// Erodes `mask` with a square element of the given radius.
pub fn erode_square(mask: &GrayImage, radius: u8) -> GrayImage {
    morphology::erode(mask, Norm::LInf, radius)
}

/// Opens `mask` (erosion then dilation), removing specks smaller than the element.
pub fn open_square(mask: &GrayImage, radius: u8) -> GrayImage {
    morphology::open(mask, Norm::LInf, radius)
}
