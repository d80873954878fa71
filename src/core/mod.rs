//! The core module of the segmentation engine.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration management and validation
//! - Error handling
//! - Traits for the external text recognizer and page rasterizer
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod traits;

pub use config::{
    CheckboxConfig, CleanerParams, CleanerSearchSpace, ConfigError, ConfigValidator,
    Dimensions, FieldSearchSpace, FormConfig, ParallelPolicy, ParameterSet,
};
pub use errors::{FormError, FormResult, ProcessingStage};
pub use traits::{PageRasterizer, RecognizedWord, TextRecognizer, join_confident_words};
