//! Page to field regions.

use std::path::Path;
use std::time::Instant;

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::core::config::ParameterSet;
use crate::core::errors::FormResult;
use crate::processors::{
    AdaptiveThreshold, BoxDeduplicator, ContourExtractor, FieldRegion, FieldRegionSelector, Rect,
    RetrievalMode, SelectedField, sort_reading_order, to_gray,
};
use crate::utils::load_rgb;

/// Deduplicated contour rectangles of a grayscale page, in reading order.
///
/// This is the part of segmentation that depends only on the threshold, so
/// the calibrator computes it once per (block size, constant) pair and then
/// tries every size window against the same candidates.
pub fn candidate_rects(
    gray: &GrayImage,
    threshold: &AdaptiveThreshold,
    deduplicator: &BoxDeduplicator,
) -> Vec<Rect> {
    let binary = threshold.apply(gray);
    let mut rects = ContourExtractor::new(RetrievalMode::List).bounding_rects(&binary);
    sort_reading_order(&mut rects);
    deduplicator.dedup(&rects)
}

/// Runs binarization, contour extraction, deduplication and selection for
/// one parameter set.
#[derive(Debug, Clone, Copy)]
pub struct FieldSegmenter {
    threshold: AdaptiveThreshold,
    deduplicator: BoxDeduplicator,
    selector: FieldRegionSelector,
}

impl FieldSegmenter {
    /// Creates a segmenter; invalid parameters are rejected before any work.
    pub fn new(params: &ParameterSet, iou_threshold: f64) -> FormResult<Self> {
        Ok(Self {
            threshold: AdaptiveThreshold::from_params(params)?,
            deduplicator: BoxDeduplicator::new(iou_threshold)?,
            selector: FieldRegionSelector::from_params(params)?,
        })
    }

    /// Candidate rectangles before size selection.
    pub fn candidates(&self, page: &RgbImage) -> Vec<Rect> {
        candidate_rects(&to_gray(page), &self.threshold, &self.deduplicator)
    }

    /// Selected fields of a page, or the single whole-page fallback.
    pub fn segment(&self, page: &RgbImage) -> Vec<SelectedField> {
        let candidates = self.candidates(page);
        self.selector.select(&candidates, page.width(), page.height())
    }

    /// Rectangles of the detected fields, excluding the fallback.
    pub fn detected_rects(&self, page: &RgbImage) -> Vec<Rect> {
        self.segment(page)
            .into_iter()
            .filter(|field| !field.fallback)
            .map(|field| field.rect)
            .collect()
    }

    /// Segments the page stored at `page_path` and writes one crop per field
    /// into `output_dir`.
    pub fn segment_file(
        &self,
        page_path: &Path,
        output_dir: &Path,
        page: usize,
    ) -> FormResult<Vec<FieldRegion>> {
        let image = load_rgb(page_path)?;
        Ok(self.segment_to_dir(&image, page_path, output_dir, page))
    }

    /// Like [`segment_file`](Self::segment_file) for a page already loaded
    /// from `page_path`.
    pub fn segment_to_dir(
        &self,
        image: &RgbImage,
        page_path: &Path,
        output_dir: &Path,
        page: usize,
    ) -> Vec<FieldRegion> {
        let start = Instant::now();
        let fields = self.segment(image);
        debug!("page {} segmented into {} fields", page, fields.len());

        let regions = self
            .selector
            .persist(image, page_path, &fields, output_dir, page);
        info!(
            "page {}: {} field regions in {:.2?}",
            page,
            regions.len(),
            start.elapsed()
        );
        regions
    }
}
