//! Top-level configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::checkbox::CheckboxConfig;
use super::errors::{ConfigError, ConfigValidator, ensure_range};
use super::parallel::ParallelPolicy;
use super::params::{CleanerParams, ParameterSet};
use super::search::{CleanerSearchSpace, FieldSearchSpace};

/// Everything the engine and the CLI can be configured with, loaded from JSON.
///
/// Every section is optional in the file and falls back to its defaults.
///
/// ```json
/// {
///   "segmentation": { "block_size": 11, "constant": 2,
///                     "min_dimension": { "width": 136, "height": 60 },
///                     "max_dimension": { "width": 1071, "height": 700 } },
///   "cleaner": { "kernel_size": 3, "iterations": 1, "area_threshold": 100.0 },
///   "parallel": { "worker_fraction": 0.5 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Calibrated segmentation parameters.
    /// If None, parameters are scaled from each page's size.
    pub segmentation: Option<ParameterSet>,

    /// Region cleaner parameters.
    pub cleaner: CleanerParams,

    /// Checkbox detector parameters.
    pub checkbox: CheckboxConfig,

    /// IoU above which a later box is considered a duplicate of an earlier one.
    /// Default: 0.08
    pub iou_threshold: f64,

    /// Minimum recognizer confidence for a word to be kept.
    /// Default: 0.85
    pub confidence_threshold: f32,

    /// Width in pixels that PDF pages are rendered at.
    /// Default: 1500
    pub render_width: u32,

    /// Calibration worker pool.
    pub parallel: ParallelPolicy,

    /// Field calibration grid.
    pub field_search: FieldSearchSpace,

    /// Cleaner calibration grid.
    pub cleaner_search: CleanerSearchSpace,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            segmentation: None,
            cleaner: CleanerParams::default(),
            checkbox: CheckboxConfig::default(),
            iou_threshold: 0.08,
            confidence_threshold: 0.85,
            render_width: 1500,
            parallel: ParallelPolicy::default(),
            field_search: FieldSearchSpace::default(),
            cleaner_search: CleanerSearchSpace::default(),
        }
    }
}

impl FormConfig {
    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }

    /// Segmentation parameters for a page: the calibrated set if present,
    /// otherwise defaults scaled from the page size.
    pub fn segmentation_for(&self, page_width: u32, page_height: u32) -> ParameterSet {
        self.segmentation
            .unwrap_or_else(|| ParameterSet::scaled_to_page(page_width, page_height))
    }
}

impl ConfigValidator for FormConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(segmentation) = &self.segmentation {
            segmentation.validate()?;
        }
        self.cleaner.validate()?;
        self.checkbox.validate()?;
        ensure_range("iou_threshold", self.iou_threshold, 0.0, 1.0)?;
        ensure_range(
            "confidence_threshold",
            self.confidence_threshold as f64,
            0.0,
            1.0,
        )?;
        if self.render_width == 0 {
            return Err(ConfigError::invalid("render_width", "must be positive"));
        }
        self.parallel.validate()?;
        self.field_search.validate()?;
        self.cleaner_search.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Dimensions;

    #[test]
    fn test_empty_json_is_default() {
        let config = FormConfig::from_json_str("{}").unwrap();
        assert!(config.segmentation.is_none());
        assert_eq!(config.iou_threshold, 0.08);
        assert_eq!(config.confidence_threshold, 0.85);
        assert_eq!(config.render_width, 1500);
    }

    #[test]
    fn test_segmentation_for_prefers_calibrated_set() {
        let calibrated =
            ParameterSet::new(7, -1, Dimensions::new(10, 10), Dimensions::new(500, 500));
        let config = FormConfig {
            segmentation: Some(calibrated),
            ..Default::default()
        };
        assert_eq!(config.segmentation_for(1500, 2100), calibrated);
        assert_eq!(
            FormConfig::default().segmentation_for(1500, 2100),
            ParameterSet::scaled_to_page(1500, 2100)
        );
    }

    #[test]
    fn test_invalid_nested_value_is_rejected() {
        let json = r#"{ "cleaner": { "kernel_size": 0, "iterations": 1, "area_threshold": 5.0 } }"#;
        assert!(matches!(
            FormConfig::from_json_str(json),
            Err(ConfigError::InvalidParameter { ref name, .. }) if name == "kernel_size"
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            FormConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        std::fs::write(&path, r#"{ "iou_threshold": 0.2 }"#).unwrap();
        let config = FormConfig::from_json_file(&path).unwrap();
        assert_eq!(config.iou_threshold, 0.2);
    }
}
