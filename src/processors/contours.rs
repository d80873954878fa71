//! Contour extraction from binary images.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use tracing::debug;

use super::geometry::{Polygon, Rect};
use super::types::RetrievalMode;

/// One traced border of a connected foreground component.
#[derive(Debug, Clone)]
pub struct ExtractedContour {
    /// Border pixels in traversal order.
    pub polygon: Polygon,
    /// Bounding rectangle of the border pixels.
    pub rect: Rect,
    /// Area enclosed by the border (shoelace over the border pixels).
    pub area: f64,
    /// Index of the enclosing border; always `None` in list mode.
    pub parent: Option<usize>,
    /// True if this border separates a component from a hole inside it.
    pub is_hole: bool,
}

impl ExtractedContour {
    /// Closed-polygon simplification with `epsilon = ratio * perimeter`.
    pub fn approximate(&self, epsilon_ratio: f64) -> Polygon {
        let epsilon = (epsilon_ratio * self.polygon.perimeter()) as f32;
        self.polygon.approx_poly_dp(epsilon)
    }

    /// Area divided by bounding-box area, in `[0, 1]` for simple shapes.
    pub fn solidity(&self) -> f64 {
        let rect_area = self.rect.area();
        if rect_area == 0 {
            return 0.0;
        }
        self.area / rect_area as f64
    }
}

/// Traces every border in a binary image.
///
/// Non-zero pixels are foreground. Contours come back in tracing order, which
/// callers must not rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContourExtractor {
    mode: RetrievalMode,
}

impl ContourExtractor {
    /// Creates an extractor with the given retrieval mode.
    pub fn new(mode: RetrievalMode) -> Self {
        Self { mode }
    }

    /// Traces all borders with their area and bounding rectangle.
    pub fn extract(&self, binary: &GrayImage) -> Vec<ExtractedContour> {
        let contours = find_contours::<u32>(binary);
        let extracted: Vec<ExtractedContour> = contours
            .iter()
            .map(|contour| {
                let polygon = Polygon::from_contour(contour);
                let rect = polygon.bounding_rect();
                let area = polygon.area();
                let parent = match self.mode {
                    RetrievalMode::List => None,
                    RetrievalMode::Tree => contour.parent,
                };
                ExtractedContour {
                    polygon,
                    rect,
                    area,
                    parent,
                    is_hole: contour.border_type == BorderType::Hole,
                }
            })
            .collect();

        debug!(
            mode = ?self.mode,
            "extracted {} contours from {}x{} image",
            extracted.len(),
            binary.width(),
            binary.height()
        );
        extracted
    }

    /// Bounding rectangles of all borders, skipping the polygon bookkeeping.
    pub fn bounding_rects(&self, binary: &GrayImage) -> Vec<Rect> {
        find_contours::<u32>(binary)
            .iter()
            .map(|contour| Polygon::from_contour(contour).bounding_rect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// A 40x40 white ring (outer 30x30, 2px thick) on black.
    fn ring() -> GrayImage {
        let mut img = GrayImage::new(40, 40);
        for y in 5..35 {
            for x in 5..35 {
                let border = x < 7 || x >= 33 || y < 7 || y >= 33;
                if border {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }
        img
    }

    #[test]
    fn test_ring_yields_outer_and_hole() {
        let contours = ContourExtractor::new(RetrievalMode::Tree).extract(&ring());
        assert_eq!(contours.len(), 2);
        let outer = contours.iter().find(|c| !c.is_hole).unwrap();
        let hole = contours.iter().find(|c| c.is_hole).unwrap();
        assert_eq!(outer.rect, Rect::new(5, 5, 30, 30));
        assert!(hole.parent.is_some());
        assert!(outer.rect.contains(&hole.rect));
        assert!((outer.area - 29.0 * 29.0).abs() < 1e-6);
    }

    #[test]
    fn test_list_mode_drops_hierarchy() {
        let contours = ContourExtractor::new(RetrievalMode::List).extract(&ring());
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| c.parent.is_none()));
        assert_eq!(
            ContourExtractor::default().bounding_rects(&ring()).len(),
            2
        );
    }

    #[test]
    fn test_filled_square_is_solid_quadrilateral() {
        let mut img = GrayImage::new(60, 60);
        for y in 10..50 {
            for x in 10..50 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = ContourExtractor::default().extract(&img);
        assert_eq!(contours.len(), 1);
        let square = &contours[0];
        assert!(square.solidity() > 0.9);
        assert_eq!(square.approximate(0.05).len(), 4);
    }

    #[test]
    fn test_empty_image_has_no_contours() {
        assert!(ContourExtractor::default().extract(&GrayImage::new(10, 10)).is_empty());
    }
}
