//! Configuration management for the segmentation engine.
//!
//! This module provides the parameter sets evaluated by the pipeline, the
//! validation trait every config implements, the calibrator's search spaces
//! and worker pool policy, and the aggregate [`FormConfig`] loaded from JSON.

pub mod checkbox;
pub mod errors;
pub mod form;
pub mod parallel;
pub mod params;
pub mod search;

// Re-export commonly used types
pub use checkbox::CheckboxConfig;
pub use errors::{ConfigError, ConfigValidator};
pub use form::FormConfig;
pub use parallel::ParallelPolicy;
pub use params::{CleanerParams, Dimensions, ParameterSet, coerce_block_size, validate_block_size};
pub use search::{CleanerSearchSpace, FieldSearchSpace};
