//! # oar-form
//!
//! Form-field and checkbox segmentation for scanned paper forms.
//!
//! A page image is binarized with an adaptive mean threshold, its contours are
//! turned into bounding rectangles, overlapping rectangles are deduplicated and
//! the survivors are filtered by a size window. Each selected field can be
//! cleaned of small noise marks and handed to an external text recognizer.
//! A separate detector finds square checkboxes and decides whether they are
//! marked from their ink density.
//!
//! The quality of segmentation depends heavily on the threshold parameters,
//! so the crate also ships a parallel grid-search calibrator that tunes them
//! against ground-truth boxes or reference transcripts.
//!
//! ## Modules
//!
//! * [`core`] - configuration, errors and collaborator traits
//! * [`processors`] - geometry and the individual image-processing stages
//! * [`pipeline`] - page segmentation and field text extraction
//! * [`calibration`] - grid-search calibrators and their scoring
//! * [`adapters`] - tesseract and (feature `pdf`) PDFium collaborators
//! * [`utils`] - image I/O, cropping, text normalization, overlays, logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use oar_form::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! oar_form::utils::init_tracing();
//!
//! let page = load_rgb("form.png")?;
//! let params = ParameterSet::scaled_to_page(page.width(), page.height());
//! let segmenter = FieldSegmenter::new(&params, DEFAULT_IOU_THRESHOLD)?;
//! for field in segmenter.segment(&page) {
//!     println!("field {}: {:?}", field.index, field.rect);
//! }
//!
//! let checkboxes = CheckboxDetector::new(CheckboxConfig::default())?;
//! println!("checked: {:?}", checkboxes.checked_indices(&page));
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod calibration;
pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::calibration::{
        CalibrationReport, CleanerCalibrator, CleanerSample, FieldCalibrator, ReferenceTexts,
        SampleId, ScoredParameterSet,
    };
    pub use crate::core::{
        CheckboxConfig, CleanerParams, CleanerSearchSpace, ConfigValidator, Dimensions,
        FieldSearchSpace, FormConfig, FormError, FormResult, ParallelPolicy, ParameterSet,
        RecognizedWord, TextRecognizer,
    };
    pub use crate::pipeline::{FieldSegmenter, FieldText, FieldTextExtractor};
    pub use crate::processors::{
        CheckBox, CheckboxDetector, DEFAULT_IOU_THRESHOLD, Direction, FieldRegion, Rect,
        RegionCleaner, SelectedField,
    };
    pub use crate::utils::load_rgb;
}
