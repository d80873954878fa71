//! Error handling for the segmentation engine.

mod types;

pub use types::{FormError, FormResult, ProcessingStage};
