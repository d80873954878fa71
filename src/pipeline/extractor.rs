//! Field segmentation followed by text recognition.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::segmenter::FieldSegmenter;
use crate::core::config::{CleanerParams, ParameterSet};
use crate::core::errors::{FormError, FormResult};
use crate::core::traits::{TextRecognizer, join_confident_words};
use crate::processors::{DEFAULT_IOU_THRESHOLD, FieldRegion, RegionCleaner};
use crate::utils::{load_rgb, reduce_whitespace};

/// Recognized text of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldText {
    /// The field the text was read from.
    pub region: FieldRegion,
    /// Confident words joined by single spaces.
    pub text: String,
}

/// Builder for [`FieldTextExtractor`].
pub struct FieldTextExtractorBuilder {
    recognizer: Arc<dyn TextRecognizer>,
    cleaner: Option<CleanerParams>,
    confidence_threshold: f32,
    iou_threshold: f64,
    keep_crops: bool,
}

impl FieldTextExtractorBuilder {
    /// Starts a builder around a recognizer.
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            cleaner: None,
            confidence_threshold: 0.85,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            keep_crops: false,
        }
    }

    /// Cleans each field with these parameters before recognition.
    pub fn cleaner(mut self, params: CleanerParams) -> Self {
        self.cleaner = Some(params);
        self
    }

    /// Minimum word confidence (default 0.85).
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// IoU threshold for box deduplication (default 0.08).
    pub fn iou_threshold(mut self, threshold: f64) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Keeps field crops on disk after recognition.
    pub fn keep_crops(mut self, keep: bool) -> Self {
        self.keep_crops = keep;
        self
    }

    /// Validates the configuration and builds the extractor.
    pub fn build(self) -> FormResult<FieldTextExtractor> {
        let cleaner = self.cleaner.map(RegionCleaner::new).transpose()?;
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(FormError::invalid_parameter(
                "confidence_threshold",
                format!("must be in [0, 1], got {}", self.confidence_threshold),
            ));
        }
        Ok(FieldTextExtractor {
            recognizer: self.recognizer,
            cleaner,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            keep_crops: self.keep_crops,
        })
    }
}

/// Reads the text of every field on a page.
///
/// Each page is segmented, each field is optionally cleaned, recognized and
/// filtered by confidence. Fields without confident text are dropped. Crops
/// are deleted afterwards unless asked otherwise; the page image itself is
/// never deleted.
pub struct FieldTextExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    cleaner: Option<RegionCleaner>,
    confidence_threshold: f32,
    iou_threshold: f64,
    keep_crops: bool,
}

impl std::fmt::Debug for FieldTextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTextExtractor")
            .field("recognizer", &self.recognizer.name())
            .field("cleaner", &self.cleaner)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("keep_crops", &self.keep_crops)
            .finish()
    }
}

impl FieldTextExtractor {
    /// Starts a builder around a recognizer.
    pub fn builder(recognizer: Arc<dyn TextRecognizer>) -> FieldTextExtractorBuilder {
        FieldTextExtractorBuilder::new(recognizer)
    }

    /// Extracts the field texts of the page image at `page_path`.
    ///
    /// When `params` is `None` the segmentation parameters are scaled from
    /// the page size. Crops are written to `work_dir`, and cleaned copies go
    /// to uniquely named temporary files there. A field that cannot be
    /// cleaned or recognized is logged and skipped.
    pub fn extract_page(
        &self,
        page_path: &Path,
        params: Option<&ParameterSet>,
        work_dir: &Path,
        page: usize,
    ) -> FormResult<Vec<FieldText>> {
        let start = Instant::now();
        let image = load_rgb(page_path)?;
        let params = match params {
            Some(params) => *params,
            None => ParameterSet::scaled_to_page(image.width(), image.height()),
        };
        let segmenter = FieldSegmenter::new(&params, self.iou_threshold)?;
        let regions = segmenter.segment_to_dir(&image, page_path, work_dir, page);

        let mut texts = Vec::with_capacity(regions.len());
        for (position, region) in regions.into_iter().enumerate() {
            match self.read_region(&region, work_dir, page, position) {
                Ok(text) if !text.is_empty() => texts.push(FieldText { region, text }),
                Ok(_) => {
                    debug!("field {:?} has no confident text", region.rect);
                    self.discard(&region);
                }
                Err(e) => {
                    warn!("skipping field {:?} on page {}: {}", region.rect, page, e);
                    self.discard(&region);
                }
            }
        }

        if !self.keep_crops {
            for text in &texts {
                self.discard(&text.region);
            }
        }

        info!(
            "page {}: {} fields with text in {:.2?}",
            page,
            texts.len(),
            start.elapsed()
        );
        Ok(texts)
    }

    fn read_region(
        &self,
        region: &FieldRegion,
        work_dir: &Path,
        page: usize,
        position: usize,
    ) -> FormResult<String> {
        let words = match &self.cleaner {
            Some(cleaner) => {
                // removed when dropped, even if recognition fails
                let cleaned = tempfile::Builder::new()
                    .prefix(&format!("cleaned_{page}_{position}_"))
                    .suffix(".png")
                    .tempfile_in(work_dir)?;
                cleaner.clean_file(&region.cropped_image, cleaned.path())?;
                self.recognizer.recognize(cleaned.path())?
            }
            None => self.recognizer.recognize(&region.cropped_image)?,
        };
        Ok(reduce_whitespace(&join_confident_words(
            &words,
            self.confidence_threshold,
        )))
    }

    fn discard(&self, region: &FieldRegion) {
        if self.keep_crops {
            return;
        }
        if let Err(e) = region.remove_crop() {
            warn!("could not remove {}: {}", region.cropped_image.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::RecognizedWord;
    use crate::utils::save_rgb;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct ScriptedRecognizer {
        words: Vec<RecognizedWord>,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
            self.seen.lock().unwrap().push(image_path.to_path_buf());
            Ok(self.words.clone())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image_path: &Path) -> FormResult<Vec<RecognizedWord>> {
            Err(FormError::recognition("failing", "engine crashed"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn blank_page(dir: &Path) -> PathBuf {
        let path = dir.join("page_0.png");
        save_rgb(&RgbImage::from_pixel(300, 200, Rgb([255, 255, 255])), &path).unwrap();
        path
    }

    #[test]
    fn test_extract_page_filters_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let page = blank_page(dir.path());
        let recognizer = Arc::new(ScriptedRecognizer {
            words: vec![
                RecognizedWord::new("Jane\n", 0.95),
                RecognizedWord::new("#", 0.2),
                RecognizedWord::new(" Doe", 0.9),
            ],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = FieldTextExtractor::builder(recognizer.clone()).build().unwrap();
        let texts = extractor.extract_page(&page, None, dir.path(), 0).unwrap();

        // A blank page has no fields, so the whole page is read.
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Jane Doe");
        assert!(texts[0].region.fallback);
        assert_eq!(recognizer.seen.lock().unwrap().as_slice(), &[page.clone()]);
        assert!(page.exists());
    }

    #[test]
    fn test_cleaning_reads_a_temporary_copy() {
        let dir = tempfile::tempdir().unwrap();
        let page = blank_page(dir.path());
        let recognizer = Arc::new(ScriptedRecognizer {
            words: vec![RecognizedWord::new("ok", 0.99)],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = FieldTextExtractor::builder(recognizer.clone())
            .cleaner(CleanerParams::default())
            .build()
            .unwrap();
        // a user file with the old fixed name must survive
        let bystander = dir.path().join("cleaned_4_0.png");
        std::fs::write(&bystander, b"not an image").unwrap();

        let texts = extractor.extract_page(&page, None, dir.path(), 4).unwrap();
        assert_eq!(texts.len(), 1);

        let seen = recognizer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].parent(), Some(dir.path()));
        let name = seen[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("cleaned_4_0_") && name.ends_with(".png"), "{name}");
        assert!(!seen[0].exists());
        assert_eq!(std::fs::read(&bystander).unwrap(), b"not an image");
        assert!(page.exists());
    }

    #[test]
    fn test_explicit_params_segment_the_loaded_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = blank_page(dir.path());
        let recognizer = Arc::new(ScriptedRecognizer {
            words: vec![RecognizedWord::new("ok", 0.99)],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = FieldTextExtractor::builder(recognizer).build().unwrap();
        let params = ParameterSet::scaled_to_page(300, 200);
        let texts = extractor
            .extract_page(&page, Some(&params), dir.path(), 1)
            .unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].region.rect, crate::processors::Rect::new(0, 0, 300, 200));
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FieldTextExtractor::builder(Arc::new(FailingRecognizer))
            .build()
            .unwrap();
        let params = ParameterSet::scaled_to_page(300, 200);
        assert!(
            extractor
                .extract_page(&dir.path().join("missing.png"), Some(&params), dir.path(), 0)
                .is_err()
        );
    }

    #[test]
    fn test_recognizer_failure_skips_field() {
        let dir = tempfile::tempdir().unwrap();
        let page = blank_page(dir.path());
        let extractor = FieldTextExtractor::builder(Arc::new(FailingRecognizer))
            .build()
            .unwrap();
        assert!(extractor.extract_page(&page, None, dir.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_builder_rejects_bad_threshold() {
        let result = FieldTextExtractor::builder(Arc::new(FailingRecognizer))
            .confidence_threshold(1.5)
            .build();
        assert!(result.is_err());
    }
}
