//! Core error types for the form segmentation engine.
//!
//! This module defines the error taxonomy shared by every stage of the pipeline,
//! from binarization through calibration, together with the [`ProcessingStage`]
//! enum used to tag where a failure happened.

use thiserror::Error;

/// Enum representing the stage of the segmentation pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Grayscale conversion and adaptive thresholding.
    Binarization,
    /// Border following and bounding box extraction.
    ContourExtraction,
    /// Size filtering and crop persistence.
    FieldSelection,
    /// Noise removal on a field crop.
    RegionCleaning,
    /// Checkbox shape classification.
    CheckboxDetection,
    /// A single grid-search evaluation.
    Calibration,
    /// Text recognition by an external engine.
    Recognition,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Binarization => write!(f, "binarization"),
            ProcessingStage::ContourExtraction => write!(f, "contour extraction"),
            ProcessingStage::FieldSelection => write!(f, "field selection"),
            ProcessingStage::RegionCleaning => write!(f, "region cleaning"),
            ProcessingStage::CheckboxDetection => write!(f, "checkbox detection"),
            ProcessingStage::Calibration => write!(f, "calibration"),
            ProcessingStage::Recognition => write!(f, "recognition"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors that can occur while segmenting forms or calibrating thresholds.
///
/// A missing region set is deliberately absent from this enum: the field
/// selector degrades to a whole-image region instead of failing, and a missing
/// OCR reference transcript scores as the worst possible value.
#[derive(Error, Debug)]
pub enum FormError {
    /// A parameter value outside its domain (even block size, zero kernel, ...).
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// Error occurred while decoding or encoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// The ground-truth table could not be read.
    #[error("ground truth")]
    GroundTruth(#[from] csv::Error),

    /// JSON (de)serialization of configs or reports failed.
    #[error("serialization")]
    Serialization(#[from] serde_json::Error),

    /// The external text recognizer failed.
    #[error("recognition failed in '{engine}': {message}")]
    Recognition {
        /// Name of the recognizer.
        engine: String,
        /// Failure description.
        message: String,
    },

    /// A document page could not be rasterized.
    #[error("failed to render page {page}: {message}")]
    Render {
        /// Zero-based page index.
        page: usize,
        /// Failure description.
        message: String,
    },
}

/// Convenience alias used across the crate.
pub type FormResult<T> = Result<T, FormError>;

impl From<image::ImageError> for FormError {
    /// Converts an image::ImageError to FormError::ImageLoad.
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for FormError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        match error {
            crate::core::config::ConfigError::InvalidParameter { name, message } => {
                Self::InvalidParameter { name, message }
            }
            other => Self::ConfigError {
                message: other.to_string(),
            },
        }
    }
}

impl FormError {
    /// Creates an [`FormError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wraps an error raised inside a pipeline stage.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a processing error that has no underlying source error.
    pub fn processing_message(kind: ProcessingStage, context: impl Into<String>) -> Self {
        let context = context.into();
        Self::Processing {
            kind,
            source: context.clone().into(),
            context,
        }
    }

    /// Creates a configuration error with enhanced context and details.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use oar_form::core::errors::FormError;
    /// let err = FormError::config_error_detailed(
    ///     "field search space",
    ///     "no block sizes to try",
    /// );
    /// assert!(matches!(err, FormError::ConfigError { .. }));
    /// ```
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a recognition error for the named engine.
    pub fn recognition(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Recognition {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Returns true for failures caused by the filesystem or image codecs.
    ///
    /// These are the errors a batch logs and skips.
    pub fn is_io(&self) -> bool {
        matches!(self, FormError::Io(_) | FormError::ImageLoad(_))
    }
}
