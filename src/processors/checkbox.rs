//! Checkbox detection and checked-state classification.
//!
//! Candidates are square, solid, four-cornered contours of the expected size
//! on the opened ink mask of a page. Nested candidates collapse to the
//! outermost box, boxes are numbered in reading order, and each box is
//! classified by how much blank paper remains inside it.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::binarize::{otsu_inverted, to_gray};
use super::contours::{ContourExtractor, ExtractedContour};
use super::geometry::Rect;
use super::morphology::{erode_square, open_square};
use super::types::RetrievalMode;
use crate::core::config::{CheckboxConfig, ConfigValidator};
use crate::core::errors::FormResult;
use crate::utils::{OverlayStyle, RectCrop, draw_box_overlay, save_rgb};

/// A detected checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckBox {
    /// Bounds on the page.
    pub rect: Rect,
    /// 1-based position in reading order.
    pub index: usize,
    /// Whether the box is marked.
    pub is_checked: bool,
    /// Fraction of the eroded box that is still blank paper.
    pub density: f64,
}

/// Files written by [`CheckboxDetector::export`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckboxArtifacts {
    /// One crop per box, `checkbox_{page}_{index}.png`.
    pub crops: Vec<PathBuf>,
    /// Annotated page, `checkboxes_{page}_debug.png`.
    pub overlay: Option<PathBuf>,
}

/// Finds checkboxes on a page and decides which are checked.
#[derive(Debug, Clone)]
pub struct CheckboxDetector {
    config: CheckboxConfig,
}

impl CheckboxDetector {
    /// Creates a detector after validating `config`.
    pub fn new(config: CheckboxConfig) -> FormResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &CheckboxConfig {
        &self.config
    }

    /// Shape test applied to every contour.
    pub fn is_candidate(&self, contour: &ExtractedContour) -> bool {
        let aspect = contour.rect.aspect_ratio();
        if aspect < self.config.min_aspect_ratio || aspect > self.config.max_aspect_ratio {
            return false;
        }
        if contour.solidity() <= self.config.min_solidity {
            return false;
        }
        let (min_area, max_area) = self.config.area_range();
        if contour.area < min_area || contour.area > max_area {
            return false;
        }
        contour.approximate(self.config.approx_epsilon_ratio).len() == 4
    }

    /// Rectangles of every candidate contour on an ink mask (ink = 255).
    pub fn candidates(&self, ink: &GrayImage) -> Vec<Rect> {
        let opened = open_square(ink, self.config.open_radius);
        ContourExtractor::new(RetrievalMode::List)
            .extract(&opened)
            .into_iter()
            .filter(|contour| self.is_candidate(contour))
            .map(|contour| contour.rect)
            .collect()
    }

    /// Detects, numbers and classifies every checkbox on `page`.
    pub fn detect(&self, page: &RgbImage) -> Vec<CheckBox> {
        let ink = otsu_inverted(&to_gray(page));
        let candidates = self.candidates(&ink);
        let accepted = resolve_containment(candidates.iter().copied());
        let ordered = sort_reading_order(accepted, self.config.row_tolerance);

        let paper = invert(&ink);
        let boxes: Vec<CheckBox> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, rect)| {
                let density = self.blank_density(&paper, &rect);
                CheckBox {
                    rect,
                    index: i + 1,
                    is_checked: density < self.config.density_threshold,
                    density,
                }
            })
            .collect();

        debug!(
            "{} checkbox candidates, {} boxes, {} checked",
            candidates.len(),
            boxes.len(),
            boxes.iter().filter(|b| b.is_checked).count()
        );
        boxes
    }

    /// Sorted 1-based indices of the checked boxes on `page`.
    pub fn checked_indices(&self, page: &RgbImage) -> Vec<usize> {
        self.detect(page)
            .into_iter()
            .filter(|b| b.is_checked)
            .map(|b| b.index)
            .collect()
    }

    /// Fraction of the box that is blank paper after eroding the paper mask,
    /// so that ink on the border does not count as blank.
    fn blank_density(&self, paper: &GrayImage, rect: &Rect) -> f64 {
        let Ok(crop) = RectCrop::crop(paper, rect) else {
            return 1.0;
        };
        let eroded = erode_square(&crop, self.config.erode_radius);
        let area = eroded.width() as f64 * eroded.height() as f64;
        if area == 0.0 {
            return 1.0;
        }
        eroded.pixels().filter(|p| p[0] > 0).count() as f64 / area
    }

    /// Writes a crop per box and an annotated copy of the page to `output_dir`.
    ///
    /// A crop that cannot be written is logged and skipped.
    pub fn export(
        &self,
        page: &RgbImage,
        boxes: &[CheckBox],
        output_dir: &Path,
        page_number: usize,
        style: &OverlayStyle,
    ) -> FormResult<CheckboxArtifacts> {
        let mut artifacts = CheckboxArtifacts::default();
        for checkbox in boxes {
            let path = output_dir.join(format!("checkbox_{page_number}_{}.png", checkbox.index));
            match RectCrop::crop(page, &checkbox.rect).and_then(|crop| save_rgb(&crop, &path)) {
                Ok(()) => artifacts.crops.push(path),
                Err(e) => warn!("skipping checkbox {} crop: {}", checkbox.index, e),
            }
        }

        let marked: Vec<(Rect, bool)> = boxes.iter().map(|b| (b.rect, b.is_checked)).collect();
        let overlay_path = output_dir.join(format!("checkboxes_{page_number}_debug.png"));
        save_rgb(&draw_box_overlay(page, &marked, style), &overlay_path)?;
        artifacts.overlay = Some(overlay_path);
        Ok(artifacts)
    }
}

/// Collapses nested candidates so that one box remains per checkbox.
///
/// A candidate inside an accepted box is dropped; a candidate enclosing
/// accepted boxes replaces them. The outermost box wins in any input order.
pub fn resolve_containment(candidates: impl IntoIterator<Item = Rect>) -> Vec<Rect> {
    candidates
        .into_iter()
        .fold(Vec::new(), |mut accepted: Vec<Rect>, candidate| {
            if accepted.iter().any(|a| a.contains(&candidate)) {
                return accepted;
            }
            accepted.retain(|a| !candidate.contains(a));
            accepted.push(candidate);
            accepted
        })
}

/// Orders boxes into rows, then left to right within each row.
///
/// A box joins the current row when its top is within `tolerance` pixels of
/// the top of the row's first box.
pub fn sort_reading_order(mut boxes: Vec<Rect>, tolerance: u32) -> Vec<Rect> {
    boxes.sort_by(Rect::reading_order);

    let mut rows: Vec<Vec<Rect>> = Vec::new();
    for rect in boxes {
        match rows.last_mut() {
            Some(row) if rect.y - row[0].y <= tolerance => row.push(rect),
            _ => rows.push(vec![rect]),
        }
    }

    rows.into_iter()
        .flat_map(|mut row| {
            row.sort_by_key(|r| r.x);
            row
        })
        .collect()
}

fn invert(mask: &GrayImage) -> GrayImage {
    let mut inverted = mask.clone();
    for pixel in inverted.pixels_mut() {
        pixel[0] = 255 - pixel[0];
    }
    inverted
}
