//! Calibration of field segmentation against ground-truth boxes.

use image::RgbImage;
use rayon::prelude::*;
use tracing::info;

use super::record::Objective;
use super::scoring::match_count;
use super::state::{CalibrationReport, SearchState, contain_panic, progress_bar};
use crate::core::config::{ConfigValidator, Dimensions, FieldSearchSpace, ParallelPolicy, ParameterSet};
use crate::core::errors::{FormError, FormResult, ProcessingStage};
use crate::pipeline::candidate_rects;
use crate::processors::{
    AdaptiveThreshold, BoxDeduplicator, DEFAULT_IOU_THRESHOLD, FieldRegionSelector, Rect, to_gray,
};

/// Grid search over segmentation parameters, scored by how many expected
/// boxes the detected fields match.
///
/// Work is split by (block size, constant) pair: each worker thresholds the
/// page once and then tries every size window against the same candidates.
/// Matching every expected box stops the search.
#[derive(Debug, Clone)]
pub struct FieldCalibrator {
    space: FieldSearchSpace,
    policy: ParallelPolicy,
    iou_threshold: f64,
    show_progress: bool,
}

impl FieldCalibrator {
    /// Creates a calibrator after validating the search space and pool policy.
    pub fn new(space: FieldSearchSpace, policy: ParallelPolicy) -> FormResult<Self> {
        space.validate()?;
        policy.validate()?;
        Ok(Self {
            space,
            policy,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            show_progress: false,
        })
    }

    /// IoU threshold used for deduplication (default 0.08).
    pub fn with_iou_threshold(mut self, iou_threshold: f64) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    /// Shows a progress bar on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The search space.
    pub fn space(&self) -> &FieldSearchSpace {
        &self.space
    }

    /// Searches for the parameters whose fields best match `expected` on `page`.
    pub fn calibrate(
        &self,
        page: &RgbImage,
        expected: &[Rect],
    ) -> FormResult<CalibrationReport<ParameterSet>> {
        let deduplicator = BoxDeduplicator::new(self.iou_threshold)?;
        let (width, height) = page.dimensions();
        let gray = to_gray(page);
        let thresholds = self.space.thresholds();
        let windows = self.space.dimension_windows(Dimensions::new(width, height));
        let total = thresholds.len() * windows.len();
        let leniency = self.space.match_leniency;

        let target = (!expected.is_empty()).then_some(expected.len() as f64);
        let state = SearchState::new(
            Objective::Maximize,
            target,
            progress_bar(total, self.show_progress),
        );

        let pool = self.policy.build_pool().map_err(|e| {
            FormError::processing(ProcessingStage::Calibration, "building worker pool", e)
        })?;
        info!(
            "calibrating fields: {} combinations on {} workers, {} expected boxes",
            total,
            pool.current_num_threads(),
            expected.len()
        );

        pool.install(|| {
            thresholds
                .par_iter()
                .enumerate()
                .for_each(|(t, &(block_size, constant))| {
                    if state.should_stop() {
                        return;
                    }
                    let candidates = match contain_panic(|| {
                        let threshold = AdaptiveThreshold::new(block_size, constant)?;
                        Ok(candidate_rects(&gray, &threshold, &deduplicator))
                    }) {
                        Ok(candidates) => candidates,
                        Err(e) => {
                            state.fail_many(windows.len(), &e.to_string());
                            return;
                        }
                    };

                    for (w, &(min, max)) in windows.iter().enumerate() {
                        if state.should_stop() {
                            break;
                        }
                        let params = ParameterSet::new(block_size, constant, min, max);
                        let outcome = contain_panic(|| {
                            let selector = FieldRegionSelector::new(min, max)?;
                            let detected: Vec<Rect> = selector
                                .select(&candidates, width, height)
                                .into_iter()
                                .filter(|field| !field.fallback)
                                .map(|field| field.rect)
                                .collect();
                            Ok(match_count(&detected, expected, leniency) as f64)
                        });
                        state.record(params, t * windows.len() + w, outcome);
                    }
                });
        });

        let report = state.finish(total);
        match &report.best {
            Some(best) => info!(
                "best field parameters matched {}/{} boxes: {:?}",
                best.score,
                expected.len(),
                best.parameters
            ),
            None => info!("no field parameters could be evaluated"),
        }
        Ok(report)
    }
}
