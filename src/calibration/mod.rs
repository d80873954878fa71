//! Parameter calibration by parallel grid search.
//!
//! [`FieldCalibrator`] tunes segmentation parameters against ground-truth
//! boxes, maximizing the number of matched fields. [`CleanerCalibrator`] tunes
//! the region cleaner against reference transcripts, minimizing recognition
//! error. Both run on a local rayon pool, share a single [`BestRecord`] and
//! stop cooperatively once a perfect score is seen.

pub mod cleaner;
pub mod field;
pub mod record;
pub mod scoring;
pub mod state;

pub use cleaner::{CleanerCalibrator, CleanerSample};
pub use field::FieldCalibrator;
pub use record::{BestRecord, Objective, ScoredParameterSet};
pub use scoring::{
    GroundTruthBox, REFERENCE_MISSING_SCORE, ReferenceTexts, SampleId, edit_distance,
    load_ground_truth, match_count, read_ground_truth, recognition_error,
};
pub use state::{CalibrationReport, progress_bar};
