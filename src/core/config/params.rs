//! Tunable parameter sets evaluated by the segmentation pipeline.
//!
//! A [`ParameterSet`] drives field segmentation (binarization plus the size
//! window of the field selector) and a [`CleanerParams`] drives the region
//! cleaner. Both are plain values: the calibrator generates many of them and
//! never mutates one after construction.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator, ensure_non_negative};

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates a new width/height pair.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Divides a page size by per-axis factors, truncating like an integer cast.
    ///
    /// Non-positive factors produce a zero dimension.
    pub fn scaled_from(page: Dimensions, width_divisor: f64, height_divisor: f64) -> Self {
        let div = |value: u32, divisor: f64| {
            if divisor > 0.0 {
                (value as f64 / divisor) as u32
            } else {
                0
            }
        };
        Self {
            width: div(page.width, width_divisor),
            height: div(page.height, height_divisor),
        }
    }
}

/// Returns the nearest valid adaptive-threshold block size (odd, at least 3).
///
/// Even values round up so that `2` becomes `3` rather than the invalid `1`.
pub fn coerce_block_size(block_size: u32) -> u32 {
    if block_size < 3 {
        3
    } else if block_size % 2 == 0 {
        block_size + 1
    } else {
        block_size
    }
}

/// Validates an adaptive-threshold block size.
pub fn validate_block_size(block_size: u32) -> Result<(), ConfigError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(ConfigError::invalid(
            "block_size",
            format!("must be an odd integer >= 3, got {block_size}"),
        ));
    }
    Ok(())
}

/// Parameters for field segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Side of the square neighborhood used for the local mean (odd, >= 3).
    pub block_size: u32,
    /// Offset subtracted from the local mean. May be negative.
    pub constant: i32,
    /// Smallest accepted field size (inclusive on both axes).
    pub min_dimension: Dimensions,
    /// Largest accepted field size (inclusive on both axes).
    pub max_dimension: Dimensions,
}

impl ParameterSet {
    /// Creates a parameter set without validating it.
    pub fn new(
        block_size: u32,
        constant: i32,
        min_dimension: Dimensions,
        max_dimension: Dimensions,
    ) -> Self {
        Self {
            block_size,
            constant,
            min_dimension,
            max_dimension,
        }
    }

    /// Uncalibrated defaults scaled from the page size.
    ///
    /// Fields must be at least 1/11 of the page wide and 1/35 tall, and at most
    /// 1/1.4 wide and 1/3 tall; thresholding uses an 11 pixel block with offset 2.
    pub fn scaled_to_page(width: u32, height: u32) -> Self {
        let page = Dimensions::new(width, height);
        Self {
            block_size: 11,
            constant: 2,
            min_dimension: Dimensions::scaled_from(page, 11.0, 35.0),
            max_dimension: Dimensions::scaled_from(page, 1.4, 3.0),
        }
    }
}

impl ConfigValidator for ParameterSet {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_block_size(self.block_size)?;
        if self.min_dimension.width > self.max_dimension.width {
            return Err(ConfigError::invalid(
                "min_dimension.width",
                format!(
                    "{} exceeds max_dimension.width {}",
                    self.min_dimension.width, self.max_dimension.width
                ),
            ));
        }
        if self.min_dimension.height > self.max_dimension.height {
            return Err(ConfigError::invalid(
                "min_dimension.height",
                format!(
                    "{} exceeds max_dimension.height {}",
                    self.min_dimension.height, self.max_dimension.height
                ),
            ));
        }
        Ok(())
    }
}

/// Parameters for the region cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanerParams {
    /// Side of the square dilation element (>= 1).
    pub kernel_size: u32,
    /// Number of dilation passes.
    pub iterations: u32,
    /// Contours enclosing less than this many pixels are erased.
    pub area_threshold: f64,
}

impl CleanerParams {
    /// Creates cleaner parameters without validating them.
    pub fn new(kernel_size: u32, iterations: u32, area_threshold: f64) -> Self {
        Self {
            kernel_size,
            iterations,
            area_threshold,
        }
    }
}

impl Default for CleanerParams {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            iterations: 1,
            area_threshold: 100.0,
        }
    }
}

impl ConfigValidator for CleanerParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel_size == 0 {
            return Err(ConfigError::invalid("kernel_size", "must be positive"));
        }
        if self.kernel_size > 255 {
            return Err(ConfigError::invalid(
                "kernel_size",
                format!("must be at most 255, got {}", self.kernel_size),
            ));
        }
        ensure_non_negative("area_threshold", self.area_threshold)
    }
}
