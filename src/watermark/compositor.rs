//! Watermark compositor for blending watermarks onto images.
//!
//! This module handles alpha blending of watermark rasters onto target images
//! at calculated positions, plus the raster transforms (scale, rotate) applied
//! to a watermark before placement.
//!
//! # Features
//!
//! - Porter-Duff "over" blending with an extra opacity factor
//! - Tiled watermark rendering
//! - Position-aware compositing with clipping at the image edges
//! - Exact quarter-turn rotation, bilinear rotation for other angles
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::compositor::{Compositor, WatermarkLayer};
//! use watermill::watermark::position::PlacementPosition;
//!
//! let mut compositor = Compositor::new();
//! compositor.add_layer(WatermarkLayer {
//!     image: &watermark_image,
//!     position: PlacementPosition { x: 10, y: 10 },
//!     opacity: 0.5,
//! });
//!
//! compositor.apply(&mut target_image);
//! ```

use super::position::{
    calculate_position, calculate_tiled_positions, rotated_bounds, ImageDimensions,
    PlacementPosition, WatermarkDimensions,
};
use super::WatermarkPosition;
use crate::constants::MAX_WATERMARK_PIXELS;
use crate::error::WatermarkError;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// A watermark layer to be composited onto an image.
#[derive(Clone, Copy)]
pub struct WatermarkLayer<'a> {
    /// The watermark image (RGBA).
    pub image: &'a RgbaImage,
    /// Position where the watermark should be placed.
    pub position: PlacementPosition,
    /// Opacity to apply (0.0 to 1.0). Applied on top of image's alpha channel.
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Compositor for applying watermark layers to images.
#[derive(Debug, Default)]
pub struct Compositor<'a> {
    layers: Vec<WatermarkLayer<'a>>,
}

impl<'a> Compositor<'a> {
    /// Create a new compositor with no layers.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a watermark layer to the compositor.
    pub fn add_layer(&mut self, layer: WatermarkLayer<'a>) {
        self.layers.push(layer);
    }

    /// Apply all watermark layers to the target image.
    ///
    /// Layers are applied in the order they were added.
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            blend_layer(target, layer);
        }
    }

    /// Get the number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Clear all layers.
    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

/// Blend a single watermark layer onto the target image.
///
/// Only the part of the layer that overlaps the target is touched.
fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer<'_>) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    let pos_x = layer.position.x as i64;
    let pos_y = layer.position.y as i64;

    // Visible region, clamped to target bounds
    let x_start = pos_x.max(0);
    let y_start = pos_y.max(0);
    let x_end = (pos_x + layer.image.width() as i64).min(target_width);
    let y_end = (pos_y + layer.image.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wm_pixel = layer.image.get_pixel((tx - pos_x) as u32, (ty - pos_y) as u32);
            let target_pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *target_pixel = blend_pixels(*target_pixel, *wm_pixel, layer.opacity);
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the Porter-Duff "over" operator with the foreground alpha scaled by
/// `opacity`. Channels are rounded to the nearest value. A foreground with no
/// effective alpha returns the background untouched; a fully opaque one
/// returns the foreground colour exactly.
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);

    if fg_alpha <= 0.0 {
        return background;
    }
    if fg_alpha >= 1.0 {
        return Rgba([foreground[0], foreground[1], foreground[2], 255]);
    }

    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let result =
            (fg as f32 * fg_alpha + bg as f32 * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        result.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

fn dimensions_of(watermark: &RgbaImage) -> WatermarkDimensions {
    WatermarkDimensions {
        width: watermark.width(),
        height: watermark.height(),
    }
}

/// Create layers for a tiled watermark.
///
/// Returns a vector of layers that tile the watermark across the entire image,
/// spaced `margin` pixels apart.
pub fn create_tiled_layers<'a>(
    watermark: &'a RgbaImage,
    image_dims: &ImageDimensions,
    margin: u32,
    opacity: f32,
) -> Vec<WatermarkLayer<'a>> {
    calculate_tiled_positions(image_dims, &dimensions_of(watermark), margin)
        .into_iter()
        .map(|position| WatermarkLayer {
            image: watermark,
            position,
            opacity,
        })
        .collect()
}

/// Create a single layer for a positioned watermark.
pub fn create_positioned_layer<'a>(
    watermark: &'a RgbaImage,
    image_dims: &ImageDimensions,
    position: WatermarkPosition,
    margin: u32,
    opacity: f32,
) -> WatermarkLayer<'a> {
    WatermarkLayer {
        image: watermark,
        position: calculate_position(position, image_dims, &dimensions_of(watermark), margin),
        opacity,
    }
}

/// Apply a watermark to an image at the configured position.
///
/// `Tiled` covers the whole image; every other position places one copy.
pub fn apply_watermark(
    target: &mut RgbaImage,
    watermark: &RgbaImage,
    position: WatermarkPosition,
    margin: u32,
    opacity: f32,
) {
    let image_dims = ImageDimensions {
        width: target.width(),
        height: target.height(),
    };

    let mut compositor = Compositor::new();
    if position.is_tiled() {
        for layer in create_tiled_layers(watermark, &image_dims, margin, opacity) {
            compositor.add_layer(layer);
        }
    } else {
        compositor.add_layer(create_positioned_layer(
            watermark,
            &image_dims,
            position,
            margin,
            opacity,
        ));
    }
    compositor.apply(target);
}

/// Check that a watermark raster of `width` x `height` may be allocated.
///
/// Fails with a render error above [`MAX_WATERMARK_PIXELS`].
pub fn check_raster_size(width: f64, height: f64) -> Result<(), WatermarkError> {
    let fits = width.is_finite()
        && height.is_finite()
        && width <= u32::MAX as f64
        && height <= u32::MAX as f64
        && width * height <= MAX_WATERMARK_PIXELS as f64;
    if fits {
        Ok(())
    } else {
        Err(WatermarkError::render(format!(
            "Watermark would be {:.0}x{:.0} pixels, above the limit of {} pixels",
            width, height, MAX_WATERMARK_PIXELS
        )))
    }
}

/// Scale a watermark by `factor`, keeping at least one pixel per axis.
pub fn scale_image(image: &RgbaImage, factor: f32) -> Result<RgbaImage, WatermarkError> {
    if factor == 1.0 {
        return Ok(image.clone());
    }

    let width = (image.width() as f64 * factor as f64).round().max(1.0);
    let height = (image.height() as f64 * factor as f64).round().max(1.0);
    check_raster_size(width, height)?;
    Ok(imageops::resize(
        image,
        width as u32,
        height as u32,
        FilterType::Lanczos3,
    ))
}

/// Rotate an image clockwise by `degrees` about its centre.
///
/// The canvas grows to the rotated bounding box. Multiples of 90 degrees are
/// exact pixel permutations; other angles use bilinear sampling on
/// premultiplied colour, with everything outside the source transparent.
pub fn rotate_image(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        return image.clone();
    } else if normalized == 90.0 {
        return imageops::rotate90(image);
    } else if normalized == 180.0 {
        return imageops::rotate180(image);
    } else if normalized == 270.0 {
        return imageops::rotate270(image);
    }

    let radians = normalized.to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let (dst_w, dst_h) = rotated_bounds(image.width(), image.height(), normalized);
    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Destination pixel centre relative to the rotation centre
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;

            // Inverse rotation back into source pixel-centre coordinates
            let sx = rx * cos + ry * sin + src_w / 2.0 - 0.5;
            let sy = -rx * sin + ry * cos + src_h / 2.0 - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

/// Bilinear sample at a fractional source position. Neighbours outside the
/// image count as transparent. Returns `None` when nothing is covered.
fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> Option<Rgba<u8>> {
    if sx <= -1.0 || sy <= -1.0 || sx >= image.width() as f32 || sy >= image.height() as f32 {
        return None;
    }

    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1.0, y0, fx * (1.0 - fy)),
        (x0, y0 + 1.0, (1.0 - fx) * fy),
        (x0 + 1.0, y0 + 1.0, fx * fy),
    ];

    let mut premultiplied = [0.0f32; 3];
    let mut alpha = 0.0f32;

    for (x, y, weight) in taps {
        if weight <= 0.0
            || x < 0.0
            || y < 0.0
            || x >= image.width() as f32
            || y >= image.height() as f32
        {
            continue;
        }
        let pixel = image.get_pixel(x as u32, y as u32);
        let a = pixel[3] as f32 * weight;
        for (channel, value) in premultiplied.iter_mut().enumerate() {
            *value += pixel[channel] as f32 * a;
        }
        alpha += a;
    }

    if alpha <= 0.0 {
        return None;
    }

    let unpremultiply = |value: f32| (value / alpha).round().clamp(0.0, 255.0) as u8;
    Some(Rgba([
        unpremultiply(premultiplied[0]),
        unpremultiply(premultiplied[1]),
        unpremultiply(premultiplied[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ]))
}
