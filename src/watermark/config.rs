//! Watermark configuration types.
//!
//! This module defines the run-wide watermark specification:
//! - Text watermarks with template variable support
//! - Image watermarks loaded from a local file
//! - Position modes (9-grid and tiled)
//!
//! A [`WatermarkSpec`] is resolved once per run and shared read-only by every
//! render.

use super::text_renderer::Color;
use crate::constants::{
    DEFAULT_FONT_SIZE, DEFAULT_MARGIN, DEFAULT_OPACITY, DEFAULT_ROTATION_DEGREES,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Watermark position on the image.
///
/// Supports 9 fixed positions (grid), plus a tiled mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    #[serde(alias = "middle-left")]
    CenterLeft,
    Center,
    #[serde(alias = "middle-right")]
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
    /// Repeating tile pattern across the entire image
    Tiled,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 10] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
        Self::Tiled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::CenterLeft => "center-left",
            Self::Center => "center",
            Self::CenterRight => "center-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
            Self::Tiled => "tiled",
        }
    }

    pub fn is_tiled(&self) -> bool {
        matches!(self, Self::Tiled)
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = String;

    /// Parses kebab-case names. Underscores and spaces are accepted in place of
    /// dashes, and `middle-left` / `middle-right` are aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let position = match normalized.as_str() {
            "top-left" => Self::TopLeft,
            "top-center" => Self::TopCenter,
            "top-right" => Self::TopRight,
            "center-left" | "middle-left" => Self::CenterLeft,
            "center" => Self::Center,
            "center-right" | "middle-right" => Self::CenterRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-center" => Self::BottomCenter,
            "bottom-right" => Self::BottomRight,
            "tiled" | "tile" => Self::Tiled,
            _ => {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                return Err(format!(
                    "unknown position '{}', expected one of: {}",
                    s,
                    known.join(", ")
                ));
            }
        };
        Ok(position)
    }
}

/// The visual source of a watermark - either text or an image file.
///
/// Uses serde tag to distinguish between types in YAML:
/// ```yaml
/// source:
///   type: text
///   text: "(c) {{taken}}"
/// ---
/// source:
///   type: image
///   path: "/srv/assets/logo.png"
///   scale: 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkSource {
    /// Text content with optional template variables
    Text { text: String },

    /// Image file composited as-is, optionally scaled by a factor
    Image {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<f32>,
    },
}

impl WatermarkSource {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::Image {
            path: path.into(),
            scale: None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// Immutable watermark settings for a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub source: WatermarkSource,
    /// Font size in pixels (text only)
    pub font_size: u32,
    /// Font family name or font file path; `None` uses the embedded font
    pub font_family: Option<String>,
    /// Text colour (text only)
    pub color: Color,
    /// Opacity from 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f32,
    pub position: WatermarkPosition,
    /// Distance from the image edges in pixels
    pub margin: u32,
    /// Clockwise rotation in degrees
    pub rotation_degrees: f32,
}

impl WatermarkSpec {
    /// Create a spec with default styling for the given source.
    pub fn new(source: WatermarkSource) -> Self {
        Self {
            source,
            font_size: DEFAULT_FONT_SIZE,
            font_family: None,
            color: Color::white(),
            opacity: DEFAULT_OPACITY,
            position: WatermarkPosition::default(),
            margin: DEFAULT_MARGIN,
            rotation_degrees: DEFAULT_ROTATION_DEGREES,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(WatermarkSource::text(text))
    }

    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::new(WatermarkSource::image(path))
    }

    pub fn with_position(mut self, position: WatermarkPosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Set the scale factor of an image watermark. Ignored for text.
    pub fn with_scale(mut self, factor: f32) -> Self {
        if let WatermarkSource::Image { scale, .. } = &mut self.source {
            *scale = Some(factor);
        }
        self
    }

    /// Validate the watermark specification.
    pub fn validate(&self) -> Result<(), String> {
        match &self.source {
            WatermarkSource::Text { text } => {
                if text.trim().is_empty() {
                    return Err("Text watermark cannot be empty".to_string());
                }
                if self.font_size == 0 {
                    return Err("Font size must be greater than 0".to_string());
                }
            }
            WatermarkSource::Image { path, scale } => {
                if path.as_os_str().is_empty() {
                    return Err("Image watermark path cannot be empty".to_string());
                }
                if let Some(scale) = scale {
                    if !scale.is_finite() || *scale <= 0.0 {
                        return Err(format!(
                            "Image watermark scale must be a finite value greater than 0, got {}",
                            scale
                        ));
                    }
                }
            }
        }

        // Check for NaN/Infinity and valid range
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!(
                "Watermark opacity must be a finite value between 0.0 and 1.0, got {}",
                self.opacity
            ));
        }

        if !self.rotation_degrees.is_finite() {
            return Err(format!(
                "Watermark rotation must be a finite number of degrees, got {}",
                self.rotation_degrees
            ));
        }

        Ok(())
    }
}
