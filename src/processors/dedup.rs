//! Removal of overlapping duplicate boxes.
//!
//! Contour tracing reports the same form field several times: once for the
//! inner edge of its printed border, again for nested artifacts. Boxes that
//! overlap an earlier box in reading order are treated as duplicates.

use tracing::debug;

use super::geometry::Rect;
use crate::core::errors::{FormError, FormResult};

/// Default IoU above which a box is a duplicate.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.08;

/// Drops boxes that overlap an earlier box by more than an IoU threshold.
#[derive(Debug, Clone, Copy)]
pub struct BoxDeduplicator {
    iou_threshold: f64,
}

impl Default for BoxDeduplicator {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl BoxDeduplicator {
    /// Creates a deduplicator. The threshold must lie in `[0, 1]`.
    pub fn new(iou_threshold: f64) -> FormResult<Self> {
        if !(0.0..=1.0).contains(&iou_threshold) {
            return Err(FormError::invalid_parameter(
                "iou_threshold",
                format!("must be in [0, 1], got {iou_threshold}"),
            ));
        }
        Ok(Self { iou_threshold })
    }

    /// The configured IoU threshold.
    pub fn iou_threshold(&self) -> f64 {
        self.iou_threshold
    }

    /// Removes every box whose IoU with some earlier box exceeds the threshold.
    ///
    /// `rects` is expected in reading order (see [`sort_reading_order`]). The
    /// survivors keep their relative order. Whether a box survives depends only
    /// on the boxes before it in the input, so the pass is idempotent.
    pub fn dedup(&self, rects: &[Rect]) -> Vec<Rect> {
        let kept: Vec<Rect> = rects
            .iter()
            .enumerate()
            .filter(|&(i, rect)| {
                !rects[..i]
                    .iter()
                    .any(|earlier| rect.iou(earlier) > self.iou_threshold)
            })
            .map(|(_, rect)| *rect)
            .collect();

        debug!(
            "deduplicated {} boxes down to {} (iou > {})",
            rects.len(),
            kept.len(),
            self.iou_threshold
        );
        kept
    }
}

/// Sorts rectangles top-to-bottom, then left-to-right.
pub fn sort_reading_order(rects: &mut [Rect]) {
    rects.sort_by(Rect::reading_order);
}
