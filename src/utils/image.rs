//! Image loading and saving.

use std::path::Path;

use image::RgbImage;

use crate::core::errors::FormResult;

/// Loads an image from disk and converts it to 8-bit RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> FormResult<RgbImage> {
    Ok(image::open(path.as_ref())?.to_rgb8())
}

/// Saves an RGB image, creating the parent directory if needed.
///
/// The format is chosen from the file extension.
pub fn save_rgb(image: &RgbImage, path: impl AsRef<Path>) -> FormResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    image.save(path)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> FormResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
        }
        _ => {}
    }
    Ok(())
}
