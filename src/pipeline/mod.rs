//! High-level segmentation pipeline.
//!
//! [`FieldSegmenter`] turns a page into field regions for one parameter set.
//! [`FieldTextExtractor`] adds optional region cleaning and text recognition
//! on top of it.

pub mod extractor;
pub mod segmenter;

pub use extractor::{FieldText, FieldTextExtractor, FieldTextExtractorBuilder};
pub use segmenter::{FieldSegmenter, candidate_rects};
