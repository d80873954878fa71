//! Size-window selection of candidate form fields.
//!
//! Selection happens in two steps. [`FieldRegionSelector::select`] decides
//! which rectangles are fields without touching the filesystem, which is
//! what the calibrator needs. [`FieldRegionSelector::persist`] then writes
//! one crop per selected field for the recognizer.

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::geometry::Rect;
use crate::core::config::{ConfigValidator, Dimensions, ParameterSet};
use crate::core::errors::{FormError, FormResult};
use crate::utils::{RectCrop, save_rgb};

/// A rectangle chosen as a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedField {
    /// Position of the rectangle in the candidate list; used in crop names.
    pub index: usize,
    /// Field bounds, inside the source image.
    pub rect: Rect,
    /// True if no rectangle qualified and this is the whole page.
    pub fallback: bool,
}

/// A selected field stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRegion {
    /// The page image the field was cut from.
    pub source_image: PathBuf,
    /// Field bounds in the source image.
    pub rect: Rect,
    /// Where the crop was written. For the fallback region this is the
    /// source image itself.
    pub cropped_image: PathBuf,
    /// True if this region is the whole-page fallback.
    pub fallback: bool,
}

impl FieldRegion {
    /// Deletes the crop written for this region.
    ///
    /// The fallback region points at the source image, which is never deleted.
    pub fn remove_crop(&self) -> FormResult<()> {
        if self.fallback || self.cropped_image == self.source_image {
            return Ok(());
        }
        match std::fs::remove_file(&self.cropped_image) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FormError::Io(e)),
        }
    }
}

/// Keeps rectangles whose size lies within an inclusive window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRegionSelector {
    min: Dimensions,
    max: Dimensions,
}

impl FieldRegionSelector {
    /// Creates a selector; `min` must not exceed `max` on either axis.
    pub fn new(min: Dimensions, max: Dimensions) -> FormResult<Self> {
        if min.width > max.width || min.height > max.height {
            return Err(FormError::invalid_parameter(
                "min_dimension",
                format!("{min:?} exceeds {max:?}"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Creates the selector described by a segmentation parameter set.
    pub fn from_params(params: &ParameterSet) -> FormResult<Self> {
        params.validate()?;
        Self::new(params.min_dimension, params.max_dimension)
    }

    /// Returns true if `rect` fits the size window on both axes.
    pub fn accepts(&self, rect: &Rect) -> bool {
        (self.min.width..=self.max.width).contains(&rect.width)
            && (self.min.height..=self.max.height).contains(&rect.height)
    }

    /// Selects the qualifying rectangles of a `width x height` image.
    ///
    /// Rectangles are clipped to the image before the size check, so every
    /// selected crop fits the window. Returns exactly one whole-image
    /// fallback field when nothing qualifies.
    pub fn select(&self, rects: &[Rect], width: u32, height: u32) -> Vec<SelectedField> {
        let selected: Vec<SelectedField> = rects
            .iter()
            .enumerate()
            .filter_map(|(index, rect)| {
                rect.clamp_to(width, height)
                    .filter(|clipped| self.accepts(clipped))
                    .map(|rect| SelectedField {
                        index,
                        rect,
                        fallback: false,
                    })
            })
            .collect();

        if selected.is_empty() {
            debug!("no field in size window {:?}..={:?}, using whole image", self.min, self.max);
            return vec![SelectedField {
                index: 0,
                rect: Rect::new(0, 0, width, height),
                fallback: true,
            }];
        }

        debug!("selected {} of {} rectangles", selected.len(), rects.len());
        selected
    }

    /// Writes one crop per selected field to `output_dir` as
    /// `contour_{page}_{index}.png`.
    ///
    /// A crop that cannot be written is logged and skipped. The fallback field
    /// is not written; its region refers to `source_path` directly.
    pub fn persist(
        &self,
        image: &RgbImage,
        source_path: &Path,
        fields: &[SelectedField],
        output_dir: &Path,
        page: usize,
    ) -> Vec<FieldRegion> {
        fields
            .iter()
            .filter_map(|field| {
                if field.fallback {
                    return Some(FieldRegion {
                        source_image: source_path.to_path_buf(),
                        rect: field.rect,
                        cropped_image: source_path.to_path_buf(),
                        fallback: true,
                    });
                }

                let cropped_path = output_dir.join(format!("contour_{page}_{}.png", field.index));
                let written = RectCrop::crop(image, &field.rect)
                    .and_then(|crop| save_rgb(&crop, &cropped_path));
                match written {
                    Ok(()) => Some(FieldRegion {
                        source_image: source_path.to_path_buf(),
                        rect: field.rect,
                        cropped_image: cropped_path,
                        fallback: false,
                    }),
                    Err(e) => {
                        warn!("skipping field {} on page {}: {}", field.index, page, e);
                        None
                    }
                }
            })
            .collect()
    }
}
