//! Rectangle based image cropping utilities.

use image::{ImageBuffer, Pixel, imageops};

use crate::core::errors::{FormError, FormResult, ProcessingStage};
use crate::processors::Rect;

/// Rectangle based image cropping utilities.
pub struct RectCrop;

impl RectCrop {
    /// Crops an image to a rectangle.
    ///
    /// The rectangle is clipped to the image first; a rectangle that lies
    /// entirely outside the image, or has zero width or height, is an error.
    ///
    /// # Arguments
    ///
    /// * `image` - The source image
    /// * `rect` - The region to copy out
    ///
    /// # Returns
    ///
    /// The cropped copy, or a processing error naming the invalid region
    pub fn crop<P>(
        image: &ImageBuffer<P, Vec<P::Subpixel>>,
        rect: &Rect,
    ) -> FormResult<ImageBuffer<P, Vec<P::Subpixel>>>
    where
        P: Pixel + 'static,
        P::Subpixel: 'static,
    {
        let clipped = rect
            .clamp_to(image.width(), image.height())
            .ok_or_else(|| {
                FormError::processing_message(
                    ProcessingStage::FieldSelection,
                    format!(
                        "invalid crop region {:?} for {}x{} image",
                        rect,
                        image.width(),
                        image.height()
                    ),
                )
            })?;

        // Use library-provided immutable crop (zero-copy view) and then materialize
        Ok(
            imageops::crop_imm(image, clipped.x, clipped.y, clipped.width, clipped.height)
                .to_image(),
        )
    }
}
