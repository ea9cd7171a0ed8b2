//! Position calculation for watermark placement.
//!
//! This module provides pure functions to calculate where watermarks should
//! be placed on images based on the configured position mode. Nothing here
//! touches pixels, so the geometry can be tested without image I/O.
//!
//! # Position Modes
//!
//! - **9-grid positions**: TopLeft, TopCenter, TopRight, CenterLeft, Center,
//!   CenterRight, BottomLeft, BottomCenter, BottomRight
//! - **Tiled**: Repeating grid pattern across the entire image
//!
//! # Example
//!
//! ```
//! use watermill::watermark::position::{calculate_position, ImageDimensions, WatermarkDimensions};
//! use watermill::watermark::WatermarkPosition;
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let watermark = WatermarkDimensions { width: 100, height: 50 };
//!
//! let pos = calculate_position(WatermarkPosition::BottomRight, &image, &watermark, 10);
//! assert_eq!((pos.x, pos.y), (690, 540)); // 800 - 100 - 10, 600 - 50 - 10
//! ```

use super::WatermarkPosition;

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a single watermark placement, in image pixels.
///
/// Coordinates may be negative when the watermark overhangs the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Calculate the position for a single watermark placement.
///
/// Corner and edge positions are inset by `margin` from the respective edges.
/// Centered axes place the watermark centre on the image centre (rounded
/// toward negative infinity). For `Tiled`, this returns the first tile at the
/// origin; use [`calculate_tiled_positions`] for the full grid.
///
/// Coordinates may be negative if the watermark is larger than the image.
pub fn calculate_position(
    position: WatermarkPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    margin: u32,
) -> PlacementPosition {
    let img_w = image.width as i64;
    let img_h = image.height as i64;
    let wm_w = watermark.width as i64;
    let wm_h = watermark.height as i64;
    let m = margin as i64;

    let left = m;
    let top = m;
    let right = img_w - wm_w - m;
    let bottom = img_h - wm_h - m;
    let center_x = (img_w - wm_w).div_euclid(2);
    let center_y = (img_h - wm_h).div_euclid(2);

    let (x, y) = match position {
        // Top row
        WatermarkPosition::TopLeft => (left, top),
        WatermarkPosition::TopCenter => (center_x, top),
        WatermarkPosition::TopRight => (right, top),

        // Center row
        WatermarkPosition::CenterLeft => (left, center_y),
        WatermarkPosition::Center => (center_x, center_y),
        WatermarkPosition::CenterRight => (right, center_y),

        // Bottom row
        WatermarkPosition::BottomLeft => (left, bottom),
        WatermarkPosition::BottomCenter => (center_x, bottom),
        WatermarkPosition::BottomRight => (right, bottom),

        WatermarkPosition::Tiled => (0, 0),
    };

    PlacementPosition::new(saturate(x), saturate(y))
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Distance between the origins of neighbouring tiles on each axis.
///
/// The stride is the watermark size plus the margin, and never less than one
/// pixel so that degenerate watermarks still terminate.
pub fn tile_stride(watermark: &WatermarkDimensions, margin: u32) -> (u32, u32) {
    (
        watermark.width.saturating_add(margin).max(1),
        watermark.height.saturating_add(margin).max(1),
    )
}

/// Calculate positions for tiled watermark placement.
///
/// Generates a grid of positions starting at the image origin and repeating
/// at [`tile_stride`] until the whole canvas is covered.
pub fn calculate_tiled_positions(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    margin: u32,
) -> Vec<PlacementPosition> {
    let (step_x, step_y) = tile_stride(watermark, margin);

    let columns = image.width.div_ceil(step_x) as usize;
    let rows = image.height.div_ceil(step_y) as usize;
    let mut positions = Vec::with_capacity(columns * rows);

    let mut y = 0u64;
    while y < image.height as u64 {
        let mut x = 0u64;
        while x < image.width as u64 {
            positions.push(PlacementPosition::new(x as i32, y as i32));
            x += step_x as u64;
        }
        y += step_y as u64;
    }

    positions
}

/// Size of the axis-aligned box that contains a `width` x `height` rectangle
/// after rotating it by `degrees` around its centre.
///
/// Quarter turns are exact; other angles are rounded up to whole pixels.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 || normalized == 180.0 {
        return (width, height);
    }
    if normalized == 90.0 || normalized == 270.0 {
        return (height, width);
    }

    let radians = normalized.to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();
    let w = width as f32;
    let h = height as f32;

    // Trim float noise so an exact fit does not grow by a pixel
    let rotated_w = (w * cos + h * sin - 1e-3).ceil().max(1.0) as u32;
    let rotated_h = (w * sin + h * cos - 1e-3).ceil().max(1.0) as u32;
    (rotated_w, rotated_h)
}

/// Check if a position is at least partially visible within the image.
pub fn is_visible(
    pos: &PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    let wm_right = pos.x as i64 + watermark.width as i64;
    let wm_bottom = pos.y as i64 + watermark.height as i64;

    (pos.x as i64) < image.width as i64
        && (pos.y as i64) < image.height as i64
        && wm_right > 0
        && wm_bottom > 0
}
