//! Text watermark rendering.
//!
//! This module renders text watermarks to RGBA images that can be
//! composited onto target images.
//!
//! # Features
//!
//! - Color parsing (names, #RGB, #RRGGBB, #RRGGBBAA and `r,g,b[,a]`)
//! - Kerning-aware measurement
//! - Multi-line text split on `\n`
//!
//! The rendered raster carries the text colour with glyph coverage in the
//! alpha channel. Opacity and rotation are applied later by the renderer.
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::font::embedded_font;
//! use watermill::watermark::text_renderer::{parse_color, render_text, TextRenderOptions};
//!
//! let font = embedded_font()?;
//! let options = TextRenderOptions {
//!     text: "Copyright 2025".to_string(),
//!     font_size: 24.0,
//!     color: parse_color("#FFFFFF")?,
//! };
//!
//! let image = render_text(&font, &options)?;
//! ```

use super::compositor::check_raster_size;
use crate::error::WatermarkError;
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;

/// Transparent border added around rendered text so antialiased edges are
/// never cut off.
const TEXT_PADDING: f32 = 1.0;

/// Parsed RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque color.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl FromStr for Color {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render. Lines are separated by `\n`.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Text color.
    pub color: Color,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::white(),
        }
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "white" => Color::new(255, 255, 255),
        "black" => Color::new(0, 0, 0),
        "red" => Color::new(255, 0, 0),
        "green" => Color::new(0, 128, 0),
        "blue" => Color::new(0, 0, 255),
        "yellow" => Color::new(255, 255, 0),
        "purple" => Color::new(128, 0, 128),
        "cyan" => Color::new(0, 255, 255),
        "magenta" => Color::new(255, 0, 255),
        "gray" | "grey" => Color::new(128, 128, 128),
        "orange" => Color::new(255, 165, 0),
        _ => return None,
    };
    Some(color)
}

/// Parse a color string.
///
/// Supports:
/// - CSS-like names (`white`, `red`, `gray`, ...)
/// - `#RGB`, `#RRGGBB` and `#RRGGBBAA` hex
/// - `r,g,b` and `r,g,b,a` decimal components (0-255)
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_color("#FFF").unwrap(), Color::new(255, 255, 255));
/// assert_eq!(parse_color("255, 0, 0").unwrap(), Color::new(255, 0, 0));
/// assert_eq!(parse_color("Orange").unwrap(), Color::new(255, 165, 0));
/// ```
pub fn parse_color(value: &str) -> Result<Color, WatermarkError> {
    let trimmed = value.trim();

    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex_color(hex)
            .ok_or_else(|| WatermarkError::config(format!("Invalid hex color '{}'", value)));
    }

    if trimmed.contains(',') {
        return parse_decimal_color(trimmed).ok_or_else(|| {
            WatermarkError::config(format!(
                "Invalid color '{}', expected r,g,b or r,g,b,a with components 0-255",
                value
            ))
        });
    }

    named_color(&trimmed.to_ascii_lowercase()).ok_or_else(|| {
        WatermarkError::config(format!(
            "Unknown color '{}', expected a color name, #RRGGBB or r,g,b",
            value
        ))
    })
}

/// Parse hex digits (without '#').
fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => {
            // Each digit doubled: 0xF -> 0xFF, 0xA -> 0xAA
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Color::new(digit(0)?, digit(1)?, digit(2)?))
        }
        6 => Some(Color::new(pair(0)?, pair(2)?, pair(4)?)),
        8 => Some(Color::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
        _ => None,
    }
}

fn parse_decimal_color(value: &str) -> Option<Color> {
    let parts: Vec<u8> = value
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [r, g, b] => Some(Color::new(*r, *g, *b)),
        [r, g, b, a] => Some(Color::rgba(*r, *g, *b, *a)),
        _ => None,
    }
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.trim_end_matches('\r'))
}

/// Advance width of a single line including kerning.
fn line_width<F: Font>(font: &ab_glyph::PxScaleFont<&F>, line: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in line.chars() {
        let glyph_id = font.glyph_id(c);

        // Add kerning if there's a previous glyph
        if let Some(prev) = prev_glyph {
            width += font.kern(prev, glyph_id);
        }

        width += font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width
}

/// Calculate the dimensions of rendered text.
///
/// The width is that of the widest line; the height covers every line plus
/// the font's line gap between them. Returns (width, height) in pixels.
pub fn measure_text(font: &FontArc, text: &str, font_size: f32) -> (u32, u32) {
    let scaled_font = font.as_scaled(PxScale::from(font_size));

    let mut widest = 0.0f32;
    let mut line_count = 0u32;
    for line in lines(text) {
        widest = widest.max(line_width(&scaled_font, line));
        line_count += 1;
    }

    let line_height = scaled_font.height();
    let gaps = line_count.saturating_sub(1) as f32;
    let height = line_height * line_count as f32 + scaled_font.line_gap() * gaps;

    (
        (widest + 2.0 * TEXT_PADDING).ceil() as u32,
        (height + 2.0 * TEXT_PADDING).ceil() as u32,
    )
}

/// Render text to an RGBA image.
///
/// Creates a new image with transparent background containing the rendered
/// text, sized by [`measure_text`].
///
/// # Arguments
///
/// * `font` - Font used for glyph outlines
/// * `options` - Text rendering options
///
/// # Returns
///
/// An RGBA image containing the rendered text, or error if rendering fails.
pub fn render_text(font: &FontArc, options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    if options.text.trim().is_empty() {
        return Err(WatermarkError::render("Cannot render empty text"));
    }
    if !options.font_size.is_finite() || options.font_size <= 0.0 {
        return Err(WatermarkError::render(format!(
            "Invalid font size {}",
            options.font_size
        )));
    }

    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let (width, height) = measure_text(font, &options.text, options.font_size);
    check_raster_size(width as f64, height as f64)?;
    let (canvas_width, canvas_height) = (width.max(1), height.max(1));
    let mut image = RgbaImage::new(canvas_width, canvas_height);

    let color = options.color;
    let line_advance = scaled_font.height() + scaled_font.line_gap();

    for (index, line) in lines(&options.text).enumerate() {
        let baseline_y = TEXT_PADDING + scaled_font.ascent() + line_advance * index as f32;
        let mut cursor_x = TEXT_PADDING;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in line.chars() {
            let glyph_id = scaled_font.glyph_id(c);

            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }

            let glyph =
                glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();

                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;

                    if x >= 0 && y >= 0 && x < canvas_width as i32 && y < canvas_height as i32 {
                        let alpha = (coverage.clamp(0.0, 1.0) * color.a as f32).round() as u8;

                        // Overlapping glyph edges keep the strongest coverage
                        let existing = image.get_pixel_mut(x as u32, y as u32);
                        if alpha > existing[3] {
                            *existing = Rgba([color.r, color.g, color.b, alpha]);
                        }
                    }
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }
    }

    Ok(image)
}
