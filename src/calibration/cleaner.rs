//! Calibration of the region cleaner against reference transcripts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::record::Objective;
use super::scoring::{REFERENCE_MISSING_SCORE, ReferenceTexts, SampleId};
use super::state::{CalibrationReport, SearchState, contain_panic, progress_bar};
use crate::core::config::{CleanerParams, CleanerSearchSpace, ConfigValidator, ParallelPolicy};
use crate::core::errors::{FormError, FormResult, ProcessingStage};
use crate::core::traits::{TextRecognizer, join_confident_words};
use crate::processors::RegionCleaner;
use crate::utils::{load_rgb, reduce_whitespace, save_rgb};

/// A field crop used to score cleaner parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerSample {
    /// Key into the reference transcripts.
    pub id: SampleId,
    /// Path of the crop.
    pub image: PathBuf,
}

impl CleanerSample {
    /// Creates a sample.
    pub fn new(id: SampleId, image: impl Into<PathBuf>) -> Self {
        Self {
            id,
            image: image.into(),
        }
    }

    /// A sample keyed by the file stem of `image`.
    pub fn from_path(image: impl Into<PathBuf>) -> Self {
        let image = image.into();
        Self {
            id: SampleId::from_path(&image),
            image,
        }
    }
}

struct LoadedSample {
    id: SampleId,
    image: RgbImage,
}

/// Grid search over cleaner parameters.
///
/// Each combination cleans every sample, recognizes the cleaned copy and sums
/// the recognition error against the sample's reference. Lower is better and
/// a total of zero stops the search. A sample without a reference makes the
/// whole combination score [`REFERENCE_MISSING_SCORE`]. A combination whose
/// recognizer returns an error or panics is counted as failed and the search
/// goes on.
pub struct CleanerCalibrator {
    recognizer: Arc<dyn TextRecognizer>,
    references: ReferenceTexts,
    space: CleanerSearchSpace,
    policy: ParallelPolicy,
    confidence_threshold: f32,
    work_dir: Option<PathBuf>,
    show_progress: bool,
}

impl fmt::Debug for CleanerCalibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanerCalibrator")
            .field("recognizer", &self.recognizer.name())
            .field("references", &self.references.len())
            .field("space", &self.space)
            .field("policy", &self.policy)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl CleanerCalibrator {
    /// Creates a calibrator after validating the search space and pool policy.
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        references: ReferenceTexts,
        space: CleanerSearchSpace,
        policy: ParallelPolicy,
    ) -> FormResult<Self> {
        space.validate()?;
        policy.validate()?;
        Ok(Self {
            recognizer,
            references,
            space,
            policy,
            confidence_threshold: 0.85,
            work_dir: None,
            show_progress: false,
        })
    }

    /// Minimum word confidence kept from the recognizer (default 0.85).
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Directory for the temporary cleaned copies; the system temp dir if unset.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Shows a progress bar on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Searches for the cleaner parameters with the lowest total recognition error.
    pub fn calibrate(
        &self,
        samples: &[CleanerSample],
    ) -> FormResult<CalibrationReport<CleanerParams>> {
        let loaded: Vec<LoadedSample> = samples
            .iter()
            .filter_map(|sample| match load_rgb(&sample.image) {
                Ok(image) => Some(LoadedSample {
                    id: sample.id.clone(),
                    image,
                }),
                Err(e) => {
                    warn!("skipping sample {}: {}", sample.image.display(), e);
                    None
                }
            })
            .collect();
        if loaded.is_empty() {
            return Err(FormError::processing_message(
                ProcessingStage::Calibration,
                "no readable cleaner samples",
            ));
        }

        let grid = self.space.parameter_sets();
        let state = SearchState::new(
            Objective::Minimize,
            Some(0.0),
            progress_bar(grid.len(), self.show_progress),
        );
        let pool = self.policy.build_pool().map_err(|e| {
            FormError::processing(ProcessingStage::Calibration, "building worker pool", e)
        })?;
        info!(
            "calibrating cleaner: {} combinations over {} samples on {} workers",
            grid.len(),
            loaded.len(),
            pool.current_num_threads()
        );

        pool.install(|| {
            grid.par_iter().enumerate().for_each(|(index, params)| {
                if state.should_stop() {
                    return;
                }
                state.record(*params, index, contain_panic(|| self.evaluate(params, &loaded)));
            });
        });

        let report = state.finish(grid.len());
        if let Some(best) = &report.best {
            info!("best cleaner parameters scored {}: {:?}", best.score, best.parameters);
        }
        Ok(report)
    }

    /// Total recognition error of one parameter set over every sample.
    fn evaluate(&self, params: &CleanerParams, samples: &[LoadedSample]) -> FormResult<f64> {
        let cleaner = RegionCleaner::new(*params)?;
        if let Some(missing) = samples
            .iter()
            .find(|sample| self.references.get(&sample.id).is_none())
        {
            debug!("no reference for sample {}", missing.id);
            return Ok(REFERENCE_MISSING_SCORE);
        }
        let mut total = 0.0;
        for sample in samples {
            let text = self.recognize_cleaned(&cleaner, &sample.image)?;
            total += self.references.score(&sample.id, &text);
        }
        Ok(total)
    }

    /// Cleans `image` into a uniquely named temporary file and recognizes it.
    ///
    /// The file is removed when the handle drops, whether or not recognition
    /// succeeded.
    fn recognize_cleaned(&self, cleaner: &RegionCleaner, image: &RgbImage) -> FormResult<String> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("oar-form-clean-").suffix(".png");
        let temp = match &self.work_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        save_rgb(&cleaner.clean(image), temp.path())?;
        let words = self.recognizer.recognize(temp.path())?;
        Ok(reduce_whitespace(&join_confident_words(
            &words,
            self.confidence_threshold,
        )))
    }

    /// Reference transcripts in use.
    pub fn references(&self) -> &ReferenceTexts {
        &self.references
    }

    /// Recognizer name, for reports.
    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Work directory for temporary copies, if set.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }
}
