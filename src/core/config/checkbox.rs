//! Checkbox detection configuration.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator, ensure_non_negative, ensure_range};

/// Configuration for the checkbox detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckboxConfig {
    /// Expected side of a checkbox glyph in pixels at the rendered resolution.
    /// Default: 70
    pub expected_side: u32,

    /// Tolerance on the side; the accepted contour area is
    /// `[(side - tolerance)^2, (side + tolerance)^2]`.
    /// Default: 10
    pub side_tolerance: u32,

    /// Smallest accepted bounding-box aspect ratio (width / height).
    /// Default: 0.85
    pub min_aspect_ratio: f64,

    /// Largest accepted bounding-box aspect ratio.
    /// Default: 1.15
    pub max_aspect_ratio: f64,

    /// Contour area divided by bounding-box area must exceed this.
    /// Default: 0.90
    pub min_solidity: f64,

    /// Polygon simplification epsilon as a fraction of the contour perimeter.
    /// Default: 0.05
    pub approx_epsilon_ratio: f64,

    /// A box is checked when its remaining blank fraction falls below this.
    /// Default: 0.4
    pub density_threshold: f64,

    /// Boxes whose tops are within this many pixels of a row's first box share the row.
    /// Default: 10
    pub row_tolerance: u32,

    /// Radius of the square element used to open the page (1 gives 3x3).
    /// Default: 1
    pub open_radius: u8,

    /// Radius of the square element used to erode a box interior before measuring density.
    /// Default: 1
    pub erode_radius: u8,
}

impl Default for CheckboxConfig {
    fn default() -> Self {
        Self {
            expected_side: 70,
            side_tolerance: 10,
            min_aspect_ratio: 0.85,
            max_aspect_ratio: 1.15,
            min_solidity: 0.90,
            approx_epsilon_ratio: 0.05,
            density_threshold: 0.4,
            row_tolerance: 10,
            open_radius: 1,
            erode_radius: 1,
        }
    }
}

impl CheckboxConfig {
    /// Smallest and largest accepted contour areas.
    pub fn area_range(&self) -> (f64, f64) {
        let low = self.expected_side.saturating_sub(self.side_tolerance) as f64;
        let high = self.expected_side as f64 + self.side_tolerance as f64;
        (low * low, high * high)
    }
}

impl ConfigValidator for CheckboxConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.expected_side == 0 {
            return Err(ConfigError::invalid("expected_side", "must be positive"));
        }
        ensure_non_negative("min_aspect_ratio", self.min_aspect_ratio)?;
        if self.min_aspect_ratio > self.max_aspect_ratio {
            return Err(ConfigError::invalid(
                "min_aspect_ratio",
                format!(
                    "{} exceeds max_aspect_ratio {}",
                    self.min_aspect_ratio, self.max_aspect_ratio
                ),
            ));
        }
        ensure_range("min_solidity", self.min_solidity, 0.0, 1.0)?;
        ensure_range("approx_epsilon_ratio", self.approx_epsilon_ratio, 0.0, 1.0)?;
        ensure_range("density_threshold", self.density_threshold, 0.0, 1.0)
    }
}
