//! Types used in image processing operations
//!
//! This module defines the contour retrieval mode used by the segmentation
//! stages and the marker placement used when annotating detected boxes.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::FormError;

/// How contours are retrieved from a binary image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Every border, no containment information.
    #[default]
    List,
    /// Every border with its parent border, so outer borders can be told apart
    /// from the holes they enclose.
    Tree,
}

/// Where an annotation marker is placed relative to the box it labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left of the box, vertically centered.
    #[default]
    Left,
    /// Right of the box, vertically centered.
    Right,
    /// Above the box, horizontally centered.
    Above,
    /// Below the box, horizontally centered.
    Below,
}

impl FromStr for Direction {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "above" | "top" => Ok(Direction::Above),
            "below" | "bottom" => Ok(Direction::Below),
            other => Err(FormError::invalid_parameter(
                "direction",
                format!("unknown direction '{other}'"),
            )),
        }
    }
}
