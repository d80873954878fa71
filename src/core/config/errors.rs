//! Configuration errors and validation trait.

use thiserror::Error;

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A single parameter is outside its allowed domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A search space has no values along some axis.
    #[error("empty search axis '{axis}'")]
    EmptySearchAxis {
        /// Name of the empty axis.
        axis: String,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Validation hook implemented by every configuration struct.
///
/// Validation runs before any pipeline work so that out-of-domain values are
/// rejected up front instead of producing undefined thresholding behavior.
pub trait ConfigValidator {
    /// Checks every field of the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Rejects a non-finite or negative floating point value.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(
            name,
            format!("expected a finite non-negative value, got {value}"),
        ));
    }
    Ok(())
}

/// Rejects a value outside `[min, max]`.
pub(crate) fn ensure_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::invalid(
            name,
            format!("expected a value in [{min}, {max}], got {value}"),
        ));
    }
    Ok(())
}

/// Rejects an empty search axis.
pub(crate) fn validate_axis<T>(axis: &str, values: &[T]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::EmptySearchAxis {
            axis: axis.to_string(),
        });
    }
    Ok(())
}
