//! Interfaces for the external collaborators the engine consumes.
//!
//! Text recognition and PDF rasterization are not part of the engine. The
//! pipeline and the calibrator only talk to them through these traits, which
//! keeps the segmentation code testable with in-memory fakes.

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::errors::FormResult;

/// A single word returned by a text recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// The recognized text.
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl RecognizedWord {
    /// Creates a new recognized word.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// OCR engine consumed by the pipeline.
///
/// Implementations must be shareable across calibration workers.
pub trait TextRecognizer: Send + Sync {
    /// Recognizes the words in the image stored at `image_path`.
    fn recognize(&self, image_path: &Path) -> FormResult<Vec<RecognizedWord>>;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;
}

/// Renders document pages to raster images.
pub trait PageRasterizer {
    /// Renders page `page_index` (zero-based) of `document` at `target_width` pixels wide.
    fn render(&self, document: &Path, page_index: usize, target_width: u32)
    -> FormResult<RgbImage>;

    /// Number of pages in `document`.
    fn page_count(&self, document: &Path) -> FormResult<usize>;

    /// Returns true if the page already carries searchable text, in which
    /// case segmenting it is unnecessary.
    fn has_text_layer(&self, _document: &Path, _page_index: usize) -> FormResult<bool> {
        Ok(false)
    }
}

/// Joins the words whose confidence reaches `threshold` with single spaces.
pub fn join_confident_words(words: &[RecognizedWord], threshold: f32) -> String {
    words
        .iter()
        .filter(|word| word.confidence >= threshold)
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
