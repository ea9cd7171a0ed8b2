//! Watermark renderer: source image + spec -> watermarked image.
//!
//! [`WatermarkRenderer::new`] prepares everything that is the same for every
//! image of a run (font, decoded and transformed image watermark, static text
//! raster), so per-image work is limited to compositing. Text containing
//! template variables is rasterised per image.
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::{WatermarkRenderer, WatermarkSpec, WatermarkPosition};
//!
//! let spec = WatermarkSpec::text("(c) ACME").with_position(WatermarkPosition::Center);
//! let renderer = WatermarkRenderer::new(&spec)?;
//!
//! let source = image::open("photo.jpg")?;
//! let watermarked = renderer.render(&source)?;
//! assert_eq!(watermarked.dimensions(), source.dimensions());
//! ```

use super::compositor::{apply_watermark, check_raster_size, rotate_image, scale_image};
use super::font::load_font;
use super::position::rotated_bounds;
use super::template::{has_variables, resolve_template, uses_variable, TemplateContext};
use super::text_renderer::{render_text, TextRenderOptions};
use super::{WatermarkSource, WatermarkSpec};
use crate::error::WatermarkError;
use ab_glyph::FontArc;
use chrono::{DateTime, Local};
use image::{ColorType, DynamicImage, ImageFormat, RgbaImage};
use std::borrow::Cow;
use std::path::Path;

/// Prepared watermark raster.
enum Mark {
    /// Text with template variables, rasterised per image
    Template { font: FontArc, template: String },
    /// Static text or image watermark, already scaled and rotated
    Fixed(RgbaImage),
}

/// Renders the watermark of one [`WatermarkSpec`] onto any number of images.
///
/// The renderer is immutable after construction and can be shared across
/// worker threads.
pub struct WatermarkRenderer {
    spec: WatermarkSpec,
    mark: Mark,
    needs_capture_date: bool,
    /// Run time used for `{{date}}` and `{{datetime}}`
    started: DateTime<Local>,
}

impl std::fmt::Debug for WatermarkRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = match &self.mark {
            Mark::Template { template, .. } => format!("template {:?}", template),
            Mark::Fixed(raster) => format!("fixed {}x{}", raster.width(), raster.height()),
        };
        f.debug_struct("WatermarkRenderer")
            .field("spec", &self.spec)
            .field("mark", &mark)
            .finish()
    }
}

impl WatermarkRenderer {
    /// Validate the spec and prepare run-wide resources.
    ///
    /// Fails with a configuration error if the spec is invalid, the font file
    /// cannot be loaded, or the watermark image cannot be decoded.
    pub fn new(spec: &WatermarkSpec) -> Result<Self, WatermarkError> {
        spec.validate().map_err(WatermarkError::config)?;

        let (mark, needs_capture_date) = match &spec.source {
            WatermarkSource::Text { text } => {
                let font = load_font(spec.font_family.as_deref())?;
                if has_variables(text) {
                    let needs_capture_date = uses_variable(text, "taken");
                    let mark = Mark::Template {
                        font,
                        template: text.clone(),
                    };
                    (mark, needs_capture_date)
                } else {
                    let raster = rasterize_text(&font, text, spec).map_err(|e| {
                        WatermarkError::config(format!("Cannot render watermark text: {}", e))
                    })?;
                    (Mark::Fixed(raster), false)
                }
            }
            WatermarkSource::Image { path, scale } => {
                let raster = load_image_mark(path, *scale, spec.rotation_degrees)?;
                (Mark::Fixed(raster), false)
            }
        };

        if let Mark::Fixed(raster) = &mark {
            tracing::debug!(
                width = raster.width(),
                height = raster.height(),
                position = %spec.position,
                "Prepared watermark"
            );
        }

        Ok(Self {
            spec: spec.clone(),
            mark,
            needs_capture_date,
            started: Local::now(),
        })
    }

    pub fn spec(&self) -> &WatermarkSpec {
        &self.spec
    }

    /// True when the watermark text depends on the file being rendered.
    pub fn needs_file_context(&self) -> bool {
        matches!(self.mark, Mark::Template { .. })
    }

    /// The prepared raster for watermarks that do not vary per file.
    pub fn fixed_mark(&self) -> Option<&RgbaImage> {
        match &self.mark {
            Mark::Fixed(raster) => Some(raster),
            Mark::Template { .. } => None,
        }
    }

    /// Time the renderer was created; every image of the run shares it.
    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Build the template context for a source file. Reads EXIF only when
    /// the template uses `{{taken}}`.
    pub fn context_for(&self, path: &Path) -> TemplateContext {
        let mut context = TemplateContext::from_path(path);
        context.set_now(self.started);
        if self.needs_capture_date {
            context.load_capture_date(path);
        }
        context
    }

    /// Render the watermark onto `image` with an empty template context.
    pub fn render(&self, image: &DynamicImage) -> Result<DynamicImage, WatermarkError> {
        let mut context = TemplateContext::new();
        context.set_now(self.started);
        self.render_with(image, &context)
    }

    /// Render the watermark onto `image`, resolving template variables from
    /// `context`.
    ///
    /// Returns a new image with the dimensions and colour type of the source.
    /// The source is never modified.
    pub fn render_with(
        &self,
        image: &DynamicImage,
        context: &TemplateContext,
    ) -> Result<DynamicImage, WatermarkError> {
        if self.spec.opacity <= 0.0 {
            return Ok(image.clone());
        }

        let mark: Cow<'_, RgbaImage> = match &self.mark {
            Mark::Fixed(raster) => Cow::Borrowed(raster),
            Mark::Template { font, template } => {
                let mut context = context.clone();
                context.set_dimensions(image.width(), image.height());

                let text = resolve_template(template, &context);
                if text.trim().is_empty() {
                    tracing::debug!(
                        file = context.filename().unwrap_or_default(),
                        "Template resolved to empty text, leaving image unchanged"
                    );
                    return Ok(image.clone());
                }
                Cow::Owned(rasterize_text(font, &text, &self.spec)?)
            }
        };

        let mut canvas = image.to_rgba8();
        apply_watermark(
            &mut canvas,
            &mark,
            self.spec.position,
            self.spec.margin,
            self.spec.opacity,
        );

        Ok(restore_color_type(canvas, image.color()))
    }
}

/// Render `image` with a one-off renderer for `spec`.
pub fn render(image: &DynamicImage, spec: &WatermarkSpec) -> Result<DynamicImage, WatermarkError> {
    WatermarkRenderer::new(spec)?.render(image)
}

fn rasterize_text(
    font: &FontArc,
    text: &str,
    spec: &WatermarkSpec,
) -> Result<RgbaImage, WatermarkError> {
    let options = TextRenderOptions {
        text: text.to_string(),
        font_size: spec.font_size as f32,
        color: spec.color,
    };
    let raster = render_text(font, &options)?;
    rotate_checked(&raster, spec.rotation_degrees)
}

/// Rotate a watermark, refusing rotated canvases above the pixel limit.
fn rotate_checked(raster: &RgbaImage, degrees: f32) -> Result<RgbaImage, WatermarkError> {
    let (width, height) = rotated_bounds(raster.width(), raster.height(), degrees);
    check_raster_size(width as f64, height as f64)?;
    Ok(rotate_image(raster, degrees))
}

fn load_image_mark(
    path: &Path,
    scale: Option<f32>,
    rotation_degrees: f32,
) -> Result<RgbaImage, WatermarkError> {
    let decoded = image::open(path).map_err(|e| {
        WatermarkError::config(format!(
            "Cannot load watermark image {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut raster = decoded.to_rgba8();
    if let Some(factor) = scale {
        raster = scale_image(&raster, factor).map_err(|e| {
            WatermarkError::config(format!("Cannot scale watermark image: {}", e))
        })?;
    }
    rotate_checked(&raster, rotation_degrees)
        .map_err(|e| WatermarkError::config(format!("Cannot rotate watermark image: {}", e)))
}

/// Convert the composited RGBA8 canvas back to the colour type of the source.
///
/// 16-bit and float sources are composited at 8-bit precision.
fn restore_color_type(canvas: RgbaImage, color: ColorType) -> DynamicImage {
    let rgba = DynamicImage::ImageRgba8(canvas);
    match color {
        ColorType::L8 => DynamicImage::ImageLuma8(rgba.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(rgba.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        ColorType::L16 => DynamicImage::ImageLuma16(rgba.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(rgba.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(rgba.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(rgba.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(rgba.to_rgb32f()),
        ColorType::Rgba32F => DynamicImage::ImageRgba32F(rgba.to_rgba32f()),
        _ => rgba,
    }
}

/// Read and decode a source image.
///
/// The content is sniffed from its magic bytes; a file whose extension names
/// a different known format fails with [`WatermarkError::UnsupportedFormat`].
pub fn decode_image(path: &Path) -> Result<DynamicImage, WatermarkError> {
    let bytes = std::fs::read(path)
        .map_err(|e| WatermarkError::decode(format!("{}: {}", path.display(), e)))?;

    let detected = image::guess_format(&bytes).map_err(|_| {
        WatermarkError::decode(format!("{}: unrecognised image data", path.display()))
    })?;

    if let Ok(expected) = ImageFormat::from_path(path) {
        if expected != detected {
            return Err(WatermarkError::UnsupportedFormat(format!(
                "{} is named as {:?} but contains {:?} data",
                path.display(),
                expected,
                detected
            )));
        }
    }

    image::load_from_memory_with_format(&bytes, detected)
        .map_err(|e| WatermarkError::decode(format!("{}: {}", path.display(), e)))
}
