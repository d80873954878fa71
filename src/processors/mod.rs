//! Image processing stages of the segmentation pipeline.
//!
//! This module contains the individual stages, leaf to root:
//! - Geometry primitives and overlap metrics
//! - Adaptive and Otsu binarization
//! - Morphological operations
//! - Contour extraction
//! - Box deduplication
//! - Field selection by size window
//! - Region cleaning
//! - Checkbox detection

pub mod binarize;
pub mod checkbox;
pub mod cleaner;
pub mod contours;
pub mod dedup;
pub mod field_select;
pub mod geometry;
pub mod morphology;
pub mod types;

pub use binarize::{AdaptiveThreshold, otsu_inverted, to_gray};
pub use checkbox::{CheckBox, CheckboxArtifacts, CheckboxDetector, resolve_containment};
pub use cleaner::RegionCleaner;
pub use contours::{ContourExtractor, ExtractedContour};
pub use dedup::{BoxDeduplicator, DEFAULT_IOU_THRESHOLD, sort_reading_order};
pub use field_select::{FieldRegion, FieldRegionSelector, SelectedField};
pub use geometry::{Point, Polygon, Rect};
pub use types::{Direction, RetrievalMode};
