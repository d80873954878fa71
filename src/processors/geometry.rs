//! Geometric primitives for form segmentation.
//!
//! This module provides the integer [`Rect`] used for every detected region,
//! the overlap metrics the deduplicator relies on, and the [`Polygon`] type
//! that carries contour outlines for area, perimeter, polygon simplification
//! and mask filling.

use image::{GrayImage, Luma};
use imageproc::contours::Contour;
use imageproc::point::Point as ImageProcPoint;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a point from an imageproc point with integer coordinates.
    pub fn from_imageproc_point(p: ImageProcPoint<u32>) -> Self {
        Self {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// An axis-aligned rectangle in integer pixel coordinates, origin top-left.
///
/// `x + width` and `y + height` are exclusive edges. Width and height are
/// unsigned, so a rectangle can never have a negative extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Pixel area `width * height`.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Area with inclusive edges, `(width + 1) * (height + 1)`.
    ///
    /// This is the convention the deduplicator uses for both operands of IoU.
    pub fn inclusive_area(&self) -> u64 {
        (self.width as u64 + 1) * (self.height as u64 + 1)
    }

    /// Intersection area with inclusive edges.
    ///
    /// Two rectangles that merely abut (one's right edge equals the other's
    /// left edge) overlap by one column and therefore have a non-zero area.
    pub fn inclusive_intersection_area(&self, other: &Rect) -> u64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 < x1 || y2 < y1 {
            return 0;
        }

        (x2 - x1 + 1) as u64 * (y2 - y1 + 1) as u64
    }

    /// Computes the Intersection over Union (IoU) with inclusive edges.
    ///
    /// # Returns
    ///
    /// A value in `[0, 1]`: `1.0` for identical rectangles and `0.0` when the
    /// rectangles neither overlap nor touch.
    pub fn iou(&self, other: &Rect) -> f64 {
        let inter = self.inclusive_intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        let union = self.inclusive_area() + other.inclusive_area() - inter;
        inter as f64 / union as f64
    }

    /// Returns true if both rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns true if `other` lies entirely inside `self` (edges may coincide).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Fixed-pixel leniency equality on every coordinate.
    pub fn approx_eq(&self, other: &Rect, leniency: u32) -> bool {
        self.x.abs_diff(other.x) <= leniency
            && self.y.abs_diff(other.y) <= leniency
            && self.width.abs_diff(other.width) <= leniency
            && self.height.abs_diff(other.height) <= leniency
    }

    /// Width divided by height, or 0.0 for a zero-height rectangle.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Clips the rectangle to an image of the given size.
    ///
    /// Returns `None` if nothing of the rectangle remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x2 = self.right().min(width);
        let y2 = self.bottom().min(height);
        if self.x >= x2 || self.y >= y2 {
            return None;
        }
        Some(Rect::new(self.x, self.y, x2 - self.x, y2 - self.y))
    }

    /// Converts to an imageproc rectangle for drawing. Empty rectangles yield `None`.
    pub fn to_imageproc_rect(&self) -> Option<imageproc::rect::Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(imageproc::rect::Rect::at(self.x as i32, self.y as i32).of_size(self.width, self.height))
    }

    /// Orders rectangles top-to-bottom, then left-to-right.
    pub fn reading_order(a: &Rect, b: &Rect) -> std::cmp::Ordering {
        a.y.cmp(&b.y).then(a.x.cmp(&b.x))
    }
}

/// A closed polygon, typically the border of a connected component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    /// The points that define the polygon, in traversal order.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a polygon from a contour traced by imageproc.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .copied()
            .map(Point::from_imageproc_point)
            .collect();
        Self { points }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Calculates the enclosed area using the shoelace formula.
    ///
    /// Returns 0.0 if the polygon has fewer than 3 points.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0f64;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x as f64 * self.points[j].y as f64;
            area -= self.points[j].x as f64 * self.points[i].y as f64;
        }
        area.abs() / 2.0
    }

    /// Calculates the closed perimeter.
    pub fn perimeter(&self) -> f64 {
        let mut perimeter = 0.0f64;
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        for i in 0..n {
            let j = (i + 1) % n;
            perimeter += (self.points[i].distance_squared(&self.points[j]) as f64).sqrt();
        }
        perimeter
    }

    /// Smallest integer rectangle containing every vertex.
    ///
    /// Vertices are pixel positions, so a single-pixel polygon has a 1x1 box.
    pub fn bounding_rect(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::new(0, 0, 0, 0);
        }
        let (mut x_min, mut y_min) = (f32::INFINITY, f32::INFINITY);
        let (mut x_max, mut y_max) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &self.points {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        let x = x_min.max(0.0) as u32;
        let y = y_min.max(0.0) as u32;
        let right = x_max.max(0.0) as u32 + 1;
        let bottom = y_max.max(0.0) as u32 + 1;
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Approximates a closed polygon with fewer vertices (Douglas-Peucker).
    ///
    /// The outline is split at the vertex farthest from the first one and each
    /// half is simplified independently, so the seam between the last and
    /// first vertex does not survive as a spurious corner.
    ///
    /// # Arguments
    ///
    /// * `epsilon` - The maximum distance between the original outline and the simplified one.
    pub fn approx_poly_dp(&self, epsilon: f32) -> Polygon {
        let n = self.points.len();
        if n <= 3 {
            return self.clone();
        }

        let origin = self.points[0];
        let far_index = (1..n)
            .max_by(|&a, &b| {
                origin
                    .distance_squared(&self.points[a])
                    .partial_cmp(&origin.distance_squared(&self.points[b]))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(n / 2);

        let first_half = douglas_peucker(&self.points[..=far_index], epsilon);

        let mut closing: Vec<Point> = self.points[far_index..].to_vec();
        closing.push(origin);
        let second_half = douglas_peucker(&closing, epsilon);

        let mut simplified = first_half;
        if second_half.len() > 2 {
            simplified.extend_from_slice(&second_half[1..second_half.len() - 1]);
        }
        Polygon::new(simplified)
    }

    /// Paints every pixel enclosed by or lying on the polygon with `value`.
    ///
    /// Interior pixels are found with an even-odd scanline pass; the vertices
    /// themselves are always painted so that degenerate outlines (single
    /// pixels, one-pixel-wide strokes) are still covered.
    pub fn fill_into(&self, mask: &mut GrayImage, value: u8) {
        let (width, height) = mask.dimensions();
        if self.points.is_empty() || width == 0 || height == 0 {
            return;
        }

        let mut scanline = ScanlineBuffer::new(self.points.len());
        let bounds = self.bounding_rect();
        for y in bounds.y..bounds.bottom().min(height) {
            for (x1, x2) in scanline.spans(self, y as f32) {
                let start = x1.ceil().max(0.0) as u32;
                let end = (x2.floor().max(0.0) as u32).min(width - 1);
                for x in start..=end {
                    mask.put_pixel(x, y, Luma([value]));
                }
            }
        }

        for p in &self.points {
            let (x, y) = (p.x as u32, p.y as u32);
            if x < width && y < height {
                mask.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

/// Iterative Douglas-Peucker simplification of an open polyline.
///
/// Both endpoints are always kept.
fn douglas_peucker(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut stack = vec![(0usize, points.len() - 1)];
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }

        // Find the point with maximum distance from the chord
        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = point_to_line_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Perpendicular distance from `point` to the line through `line_start` and `line_end`.
fn point_to_line_distance(point: &Point, line_start: &Point, line_end: &Point) -> f32 {
    let a = line_end.y - line_start.y;
    let b = line_start.x - line_end.x;
    let c = line_end.x * line_start.y - line_start.x * line_end.y;

    let denominator = (a * a + b * b).sqrt();
    if denominator == 0.0 {
        // Degenerate chord: fall back to point distance.
        return point.distance_squared(line_start).sqrt();
    }

    (a * point.x + b * point.y + c).abs() / denominator
}

/// Reusable buffer for polygon scanline intersections.
struct ScanlineBuffer {
    intersections: Vec<f32>,
}

impl ScanlineBuffer {
    fn new(max_polygon_points: usize) -> Self {
        Self {
            intersections: Vec::with_capacity(max_polygon_points),
        }
    }

    /// Interior spans of `polygon` on the horizontal line `y`, as `(x_start, x_end)` pairs.
    fn spans(&mut self, polygon: &Polygon, y: f32) -> Vec<(f32, f32)> {
        self.intersections.clear();

        let n = polygon.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let p1 = &polygon.points[i];
            let p2 = &polygon.points[j];

            // Check if the edge crosses the scanline
            if ((p1.y <= y && y < p2.y) || (p2.y <= y && y < p1.y))
                && (p2.y - p1.y).abs() > f32::EPSILON
            {
                let x = p1.x + (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y);
                self.intersections.push(x);
            }
        }

        self.intersections
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        self.intersections
            .chunks(2)
            .filter(|chunk| chunk.len() == 2 && chunk[0] <= chunk[1])
            .map(|chunk| (chunk[0], chunk[1]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_outline(x0: f32, y0: f32, side: f32) -> Polygon {
        // Dense outline, one vertex per border pixel, like a traced contour.
        let last = side - 1.0;
        let mut points = Vec::new();
        for i in 0..side as usize {
            points.push(Point::new(x0 + i as f32, y0));
        }
        for i in 1..side as usize {
            points.push(Point::new(x0 + last, y0 + i as f32));
        }
        for i in (0..(side as usize - 1)).rev() {
            points.push(Point::new(x0 + i as f32, y0 + last));
        }
        for i in (1..(side as usize - 1)).rev() {
            points.push(Point::new(x0, y0 + i as f32));
        }
        Polygon::new(points)
    }

    #[test]
    fn test_rect_edges_saturate() {
        let rect = Rect::new(u32::MAX - 5, 10, 100, u32::MAX);
        assert_eq!(rect.right(), u32::MAX);
        assert_eq!(rect.bottom(), u32::MAX);
        assert_eq!(Rect::new(3, 4, 5, 6).right(), 8);
    }

    #[test]
    fn test_rect_iou_identity_and_disjoint() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(50, 50, 10, 10);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_rect_iou_abutting_counts_one_pixel() {
        // a covers [0, 10), b starts at 10: inclusive convention overlaps by 1 column.
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.inclusive_intersection_area(&b), 11);
        let expected = 11.0 / (121.0 + 121.0 - 11.0);
        assert!((a.iou(&b) - expected).abs() < 1e-12);
        assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-12);
    }

    #[test]
    fn test_rect_iou_partial_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        // inclusive: intersection 6x6 = 36, areas 121 each
        let expected = 36.0 / (242.0 - 36.0);
        assert!((a.iou(&b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rect_contains_and_intersects() {
        let outer = Rect::new(0, 0, 100, 100);
        let inner = Rect::new(10, 10, 20, 20);
        let touching = Rect::new(100, 0, 10, 10);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&touching));
    }

    #[test]
    fn test_rect_approx_eq() {
        let a = Rect::new(100, 100, 50, 20);
        assert!(a.approx_eq(&Rect::new(104, 97, 53, 20), 5));
        assert!(!a.approx_eq(&Rect::new(106, 100, 50, 20), 5));
    }

    #[test]
    fn test_rect_clamp_to() {
        let r = Rect::new(80, 90, 50, 50);
        assert_eq!(r.clamp_to(100, 100), Some(Rect::new(80, 90, 20, 10)));
        assert_eq!(Rect::new(120, 0, 5, 5).clamp_to(100, 100), None);
    }

    #[test]
    fn test_polygon_area_and_bounding_rect() {
        let square = square_outline(10.0, 20.0, 70.0);
        assert!((square.area() - 69.0 * 69.0).abs() < 1e-6);
        assert_eq!(square.bounding_rect(), Rect::new(10, 20, 70, 70));
        assert!((square.perimeter() - 4.0 * 69.0).abs() < 1e-3);
    }

    #[test]
    fn test_approx_poly_dp_square_has_four_vertices() {
        let square = square_outline(0.0, 0.0, 40.0);
        let epsilon = 0.05 * square.perimeter() as f32;
        let approx = square.approx_poly_dp(epsilon);
        assert_eq!(approx.len(), 4, "got {:?}", approx.points);
    }

    #[test]
    fn test_fill_into_covers_interior_and_outline() {
        let square = square_outline(2.0, 2.0, 5.0);
        let mut mask = GrayImage::new(10, 10);
        square.fill_into(&mut mask, 255);
        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..7).contains(&x) && (2..7).contains(&y);
                assert_eq!(mask.get_pixel(x, y)[0] == 255, inside, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_fill_into_single_point() {
        let dot = Polygon::new(vec![Point::new(3.0, 4.0)]);
        let mut mask = GrayImage::new(8, 8);
        dot.fill_into(&mut mask, 255);
        assert_eq!(mask.get_pixel(3, 4)[0], 255);
        assert_eq!(mask.pixels().filter(|p| p[0] == 255).count(), 1);
    }
}
