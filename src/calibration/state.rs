//! Shared state of one grid search.

use std::any::Any;
use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::record::{BestRecord, Objective, ScoredParameterSet};
use crate::core::errors::{FormError, FormResult, ProcessingStage};

/// Outcome of a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport<P> {
    /// The best combination, if any evaluation succeeded.
    pub best: Option<ScoredParameterSet<P>>,
    /// Size of the search grid.
    pub total: usize,
    /// Combinations that were scored.
    pub evaluated: usize,
    /// Combinations whose evaluation failed.
    pub failed: usize,
    /// True if the search stopped on a perfect score before covering the grid.
    pub stopped_early: bool,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

impl<P> CalibrationReport<P> {
    /// Combinations never started because the search stopped early.
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.evaluated + self.failed)
    }
}

/// Builds the progress bar for a search; hidden unless `visible`.
pub fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Runs one unit of calibration work, turning a panic into an error.
///
/// A panic inside `work` comes back as a calibration error, so it counts as
/// one failed combination and never unwinds through the worker pool.
pub(crate) fn contain_panic<T>(work: impl FnOnce() -> FormResult<T>) -> FormResult<T> {
    catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        Err(FormError::processing_message(
            ProcessingStage::Calibration,
            format!("evaluation panicked: {}", panic_message(payload.as_ref())),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Everything workers share while a grid is being searched.
///
/// The best record is the only state behind a lock. Counters and the stop
/// flag are atomics; a worker checks [`should_stop`](Self::should_stop)
/// before starting a combination, and evaluations already running when the
/// flag is raised are still scored.
pub(crate) struct SearchState<P> {
    record: BestRecord<P>,
    target: Option<f64>,
    stop: AtomicBool,
    evaluated: AtomicUsize,
    failed: AtomicUsize,
    progress: ProgressBar,
    started: Instant,
}

impl<P: Clone + Debug> SearchState<P> {
    /// Creates the state for a grid of `total` combinations.
    ///
    /// Reaching `target` under `objective` raises the stop flag.
    pub(crate) fn new(objective: Objective, target: Option<f64>, progress: ProgressBar) -> Self {
        Self {
            record: BestRecord::new(objective),
            target,
            stop: AtomicBool::new(false),
            evaluated: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            progress,
            started: Instant::now(),
        }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Records the outcome of one combination.
    pub(crate) fn record(&self, parameters: P, grid_index: usize, outcome: FormResult<f64>) {
        match outcome {
            Ok(score) => {
                self.evaluated.fetch_add(1, Ordering::Relaxed);
                let improved = self
                    .record
                    .offer(ScoredParameterSet::new(parameters.clone(), score, grid_index));
                if improved {
                    info!("new best score {} at grid index {}: {:?}", score, grid_index, parameters);
                    self.progress.set_message(format!("best {score:.3}"));
                }
                if let Some(target) = self.target
                    && self.record.objective().reaches(score, target)
                    && !self.stop.swap(true, Ordering::AcqRel)
                {
                    info!("perfect score reached, stopping search");
                }
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("evaluation {} failed for {:?}: {}", grid_index, parameters, e);
            }
        }
        self.progress.inc(1);
    }

    /// Marks `count` combinations as failed without evaluating them.
    pub(crate) fn fail_many(&self, count: usize, reason: &str) {
        self.failed.fetch_add(count, Ordering::Relaxed);
        warn!("{} combinations failed: {}", count, reason);
        self.progress.inc(count as u64);
    }

    /// Closes the progress bar and produces the report.
    pub(crate) fn finish(self, total: usize) -> CalibrationReport<P> {
        self.progress.finish_and_clear();
        let evaluated = self.evaluated.into_inner();
        let failed = self.failed.into_inner();
        let stopped_early = self.stop.into_inner() && evaluated + failed < total;
        let report = CalibrationReport {
            best: self.record.into_best(),
            total,
            evaluated,
            failed,
            stopped_early,
            elapsed_ms: self.started.elapsed().as_millis(),
        };
        debug!(
            "search finished: {} evaluated, {} failed, {} skipped",
            report.evaluated,
            report.failed,
            report.skipped()
        );
        report
    }
}
