//! Debug overlays for detected boxes.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};

use crate::processors::{Direction, Rect};

/// Colors and marker placement for a box overlay.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    /// Outline color for boxes flagged as checked.
    pub checked: Rgb<u8>,
    /// Outline color for the other boxes.
    pub unchecked: Rgb<u8>,
    /// Outline thickness in pixels.
    pub thickness: u32,
    /// Side of the square marker drawn next to checked boxes.
    pub marker_size: u32,
    /// Distance between a box and its marker.
    pub marker_gap: u32,
    /// Side of the box the marker is drawn on.
    pub direction: Direction,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            checked: Rgb([220, 30, 30]),
            unchecked: Rgb([30, 160, 60]),
            thickness: 3,
            marker_size: 12,
            marker_gap: 6,
            direction: Direction::Left,
        }
    }
}

/// Where a marker of `size` pixels goes for `rect`, or `None` if it would
/// fall (even partly) outside a `width x height` image.
pub fn marker_rect(
    rect: &Rect,
    direction: Direction,
    size: u32,
    gap: u32,
    width: u32,
    height: u32,
) -> Option<Rect> {
    let (size, gap) = (size as i64, gap as i64);
    let (x, y) = (rect.x as i64, rect.y as i64);
    let (w, h) = (rect.width as i64, rect.height as i64);

    let (mx, my) = match direction {
        Direction::Left => (x - gap - size, y + h / 2 - size / 2),
        Direction::Right => (x + w + gap, y + h / 2 - size / 2),
        Direction::Above => (x + w / 2 - size / 2, y - gap - size),
        Direction::Below => (x + w / 2 - size / 2, y + h + gap),
    };

    if mx < 0 || my < 0 || mx + size > width as i64 || my + size > height as i64 {
        return None;
    }
    Some(Rect::new(mx as u32, my as u32, size as u32, size as u32))
}

/// Draws every box outline on a copy of `image`, plus a marker next to the
/// boxes flagged `true`.
pub fn draw_box_overlay(image: &RgbImage, boxes: &[(Rect, bool)], style: &OverlayStyle) -> RgbImage {
    let mut canvas = image.clone();
    let (width, height) = canvas.dimensions();

    for (rect, flagged) in boxes {
        let color = if *flagged { style.checked } else { style.unchecked };

        for inset in 0..style.thickness {
            let ring = Rect::new(
                rect.x + inset,
                rect.y + inset,
                rect.width.saturating_sub(2 * inset),
                rect.height.saturating_sub(2 * inset),
            );
            if let Some(outline) = ring.to_imageproc_rect() {
                draw_hollow_rect_mut(&mut canvas, outline, color);
            }
        }

        if *flagged {
            let marker = marker_rect(
                rect,
                style.direction,
                style.marker_size,
                style.marker_gap,
                width,
                height,
            )
            .and_then(|m| m.to_imageproc_rect());
            if let Some(marker) = marker {
                draw_filled_rect_mut(&mut canvas, marker, style.checked);
            }
        }
    }
    canvas
}
