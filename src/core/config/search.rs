//! Grid-search spaces explored by the calibrator.
//!
//! A search space lists candidate values per axis. The calibrator evaluates
//! the cartesian product of all axes, so the enumeration order here also
//! defines the grid index used to break score ties.

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator, ensure_non_negative, validate_axis};
use super::params::{CleanerParams, Dimensions, ParameterSet, validate_block_size};

/// Candidate values for field segmentation calibration.
///
/// Dimension windows are expressed as page-size divisors: a min width divisor
/// of 11 means "fields are at least 1/11 of the page wide".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSearchSpace {
    /// Adaptive-threshold block sizes.
    /// Default: 3, 5, ..., 15
    pub block_sizes: Vec<u32>,
    /// Adaptive-threshold constants.
    /// Default: -4..=4
    pub constants: Vec<i32>,
    /// Page width divisors for the minimum field width.
    pub min_width_divisors: Vec<f64>,
    /// Page height divisors for the minimum field height.
    pub min_height_divisors: Vec<f64>,
    /// Page width divisors for the maximum field width.
    pub max_width_divisors: Vec<f64>,
    /// Page height divisors for the maximum field height.
    pub max_height_divisors: Vec<f64>,
    /// Per-coordinate pixel leniency when matching against ground truth.
    /// Default: 10
    pub match_leniency: u32,
}

impl Default for FieldSearchSpace {
    fn default() -> Self {
        Self {
            block_sizes: (3..=15).step_by(2).collect(),
            constants: (-4..=4).collect(),
            min_width_divisors: vec![11.0, 20.0, 30.0, 40.0],
            min_height_divisors: vec![20.0, 35.0, 50.0],
            max_width_divisors: vec![1.2, 1.4, 2.0],
            max_height_divisors: vec![2.0, 3.0, 4.0],
            match_leniency: 10,
        }
    }
}

impl FieldSearchSpace {
    /// Every (block size, constant) pair, in grid order.
    pub fn thresholds(&self) -> Vec<(u32, i32)> {
        iproduct!(self.block_sizes.iter().copied(), self.constants.iter().copied()).collect()
    }

    /// Every (min, max) dimension window for a page, in grid order.
    pub fn dimension_windows(&self, page: Dimensions) -> Vec<(Dimensions, Dimensions)> {
        iproduct!(
            self.min_width_divisors.iter(),
            self.min_height_divisors.iter(),
            self.max_width_divisors.iter(),
            self.max_height_divisors.iter()
        )
        .map(|(&min_w, &min_h, &max_w, &max_h)| {
            (
                Dimensions::scaled_from(page, min_w, min_h),
                Dimensions::scaled_from(page, max_w, max_h),
            )
        })
        .collect()
    }

    /// Every parameter set for a page, in grid order.
    pub fn parameter_sets(&self, page: Dimensions) -> Vec<ParameterSet> {
        let windows = self.dimension_windows(page);
        self.thresholds()
            .into_iter()
            .flat_map(|(block_size, constant)| {
                windows
                    .iter()
                    .map(move |&(min, max)| ParameterSet::new(block_size, constant, min, max))
            })
            .collect()
    }

    /// Number of combinations in the grid.
    pub fn len(&self) -> usize {
        self.block_sizes.len()
            * self.constants.len()
            * self.min_width_divisors.len()
            * self.min_height_divisors.len()
            * self.max_width_divisors.len()
            * self.max_height_divisors.len()
    }

    /// Returns true if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigValidator for FieldSearchSpace {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_axis("block_sizes", &self.block_sizes)?;
        validate_axis("constants", &self.constants)?;
        validate_axis("min_width_divisors", &self.min_width_divisors)?;
        validate_axis("min_height_divisors", &self.min_height_divisors)?;
        validate_axis("max_width_divisors", &self.max_width_divisors)?;
        validate_axis("max_height_divisors", &self.max_height_divisors)?;

        for &block_size in &self.block_sizes {
            validate_block_size(block_size)?;
        }
        for (name, divisors) in [
            ("min_width_divisors", &self.min_width_divisors),
            ("min_height_divisors", &self.min_height_divisors),
            ("max_width_divisors", &self.max_width_divisors),
            ("max_height_divisors", &self.max_height_divisors),
        ] {
            for &divisor in divisors {
                if !(divisor.is_finite() && divisor > 0.0) {
                    return Err(ConfigError::invalid(
                        name,
                        format!("divisors must be positive, got {divisor}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Candidate values for region cleaner calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerSearchSpace {
    /// Dilation element sizes.
    /// Default: 1, 3, 5
    pub kernel_sizes: Vec<u32>,
    /// Dilation pass counts.
    /// Default: 1, 2, 3
    pub iterations: Vec<u32>,
    /// Area thresholds below which contours are erased.
    /// Default: 10, 25, 50, 100, 200, 400
    pub area_thresholds: Vec<f64>,
}

impl Default for CleanerSearchSpace {
    fn default() -> Self {
        Self {
            kernel_sizes: vec![1, 3, 5],
            iterations: vec![1, 2, 3],
            area_thresholds: vec![10.0, 25.0, 50.0, 100.0, 200.0, 400.0],
        }
    }
}

impl CleanerSearchSpace {
    /// Every cleaner parameter combination, in grid order.
    pub fn parameter_sets(&self) -> Vec<CleanerParams> {
        iproduct!(
            self.kernel_sizes.iter().copied(),
            self.iterations.iter().copied(),
            self.area_thresholds.iter().copied()
        )
        .map(|(kernel_size, iterations, area_threshold)| {
            CleanerParams::new(kernel_size, iterations, area_threshold)
        })
        .collect()
    }

    /// Number of combinations in the grid.
    pub fn len(&self) -> usize {
        self.kernel_sizes.len() * self.iterations.len() * self.area_thresholds.len()
    }

    /// Returns true if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigValidator for CleanerSearchSpace {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_axis("kernel_sizes", &self.kernel_sizes)?;
        validate_axis("iterations", &self.iterations)?;
        validate_axis("area_thresholds", &self.area_thresholds)?;
        if self.kernel_sizes.contains(&0) {
            return Err(ConfigError::invalid("kernel_sizes", "must be positive"));
        }
        for &threshold in &self.area_thresholds {
            ensure_non_negative("area_thresholds", threshold)?;
        }
        Ok(())
    }
}
