//! Watermark module for applying text and image watermarks to images.
//!
//! # Features
//!
//! - **Text watermarks** with template variable support (file name, EXIF
//!   capture date, dimensions, dates)
//! - **Image watermarks** from a local file, optionally scaled
//! - **10 positioning modes**: 9-grid and tiled
//! - **Rotation** by any angle, exact for quarter turns
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   source:
//!     type: text
//!     text: "(c) ACME {{taken}}"
//!   font_size: 32
//!   color: "#FFFFFF"
//!   opacity: 0.6
//!   position: bottom-right
//!   margin: 20
//! ```
//!
//! # Template Variables
//!
//! Text watermarks support the following template variables:
//! - `{{filename}}`, `{{stem}}`, `{{ext}}` - Source file name parts
//! - `{{width}}`, `{{height}}` - Source dimensions
//! - `{{date}}`, `{{datetime}}` - Time of the run
//! - `{{taken}}`, `{{modified}}` - Capture and modification dates

pub mod compositor;
pub mod config;
pub mod font;
pub mod position;
pub mod renderer;
pub mod template;
pub mod text_renderer;

// Re-export main types for convenience
pub use compositor::{
    apply_watermark, blend_pixels, create_positioned_layer, create_tiled_layers, rotate_image,
    scale_image, Compositor, WatermarkLayer,
};
pub use config::{WatermarkPosition, WatermarkSource, WatermarkSpec};
pub use position::{
    calculate_position, calculate_tiled_positions, is_visible, rotated_bounds, ImageDimensions,
    PlacementPosition, WatermarkDimensions,
};
pub use renderer::{decode_image, render, WatermarkRenderer};
pub use template::{resolve_template, TemplateContext};
pub use text_renderer::{measure_text, parse_color, render_text, Color, TextRenderOptions};
