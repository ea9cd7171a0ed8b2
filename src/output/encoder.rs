//! Image encoder abstraction
//!
//! Provides a trait-based encoder system that allows:
//! - One encoder per output format behind a common interface
//! - Consistent quality settings across formats
//! - Reducing pixel data to what each format can store

use super::format::OutputFormat;
use crate::error::WatermarkError;
use image::{ColorType, DynamicImage, ImageOutputFormat};
use std::io::Cursor;

/// Trait for image encoders
///
/// Implementations handle encoding a decoded image to a specific format.
/// The trait is object-safe to allow dynamic dispatch.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode the image to the target format
    ///
    /// # Arguments
    /// * `image` - Image in any colour type
    /// * `quality` - Quality 1-100, used by lossy formats
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Encoded file contents
    /// * `Err(WatermarkError::Write)` - If encoding fails
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, WatermarkError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool {
        self.format().supports_transparency()
    }
}

fn encode_failed(format: OutputFormat, error: impl std::fmt::Display) -> WatermarkError {
    WatermarkError::write(format!("{} encoding failed: {}", format, error))
}

fn is_grayscale(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

fn is_eight_bit(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
    )
}

/// Reduce to the 8-bit colour type with the same channels.
fn to_eight_bit(image: &DynamicImage) -> DynamicImage {
    let color = image.color();
    if is_eight_bit(color) {
        return image.clone();
    }
    match (is_grayscale(color), color.has_alpha()) {
        (true, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (true, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (false, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (false, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

/// Float data has no integer container; store it as 16-bit.
fn floats_to_sixteen_bit(image: &DynamicImage) -> Option<DynamicImage> {
    match image.color() {
        ColorType::Rgb32F => Some(DynamicImage::ImageRgb16(image.to_rgb16())),
        ColorType::Rgba32F => Some(DynamicImage::ImageRgba16(image.to_rgba16())),
        _ => None,
    }
}

fn write_with(
    image: &DynamicImage,
    format: OutputFormat,
    output_format: ImageOutputFormat,
) -> Result<Vec<u8>, WatermarkError> {
    let mut output = Cursor::new(Vec::new());
    image
        .write_to(&mut output, output_format)
        .map_err(|e| encode_failed(format, e))?;
    Ok(output.into_inner())
}

/// JPEG encoder using the image crate
///
/// Alpha is dropped; grayscale stays grayscale.
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG doesn't support alpha or 16-bit samples
        let flattened = if is_grayscale(image.color()) {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));

        encoder
            .write_image(
                flattened.as_bytes(),
                flattened.width(),
                flattened.height(),
                flattened.color(),
            )
            .map_err(|e| encode_failed(OutputFormat::Jpeg, e))?;

        Ok(output.into_inner())
    }
}

/// PNG encoder using the image crate
///
/// Keeps 8- and 16-bit data as-is.
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, WatermarkError> {
        match floats_to_sixteen_bit(image) {
            Some(converted) => write_with(&converted, OutputFormat::Png, ImageOutputFormat::Png),
            None => write_with(image, OutputFormat::Png, ImageOutputFormat::Png),
        }
    }
}

/// WebP encoder using the image crate
///
/// Note: The `image` crate only supports lossless WebP encoding.
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::webp::WebPEncoder as ImageWebPEncoder;
        use image::ImageEncoder as _;

        let rgba = image.to_rgba8();
        let mut output = Cursor::new(Vec::new());
        let encoder = ImageWebPEncoder::new_lossless(&mut output);

        encoder
            .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
            .map_err(|e| encode_failed(OutputFormat::WebP, e))?;

        Ok(output.into_inner())
    }
}

/// BMP encoder using the image crate (8-bit only)
pub struct BmpEncoder;

impl ImageEncoder for BmpEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Bmp
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, WatermarkError> {
        write_with(&to_eight_bit(image), OutputFormat::Bmp, ImageOutputFormat::Bmp)
    }
}

/// TIFF encoder using the image crate
///
/// Keeps 8- and 16-bit gray, RGB and RGBA. Gray+alpha becomes RGBA.
pub struct TiffEncoder;

impl ImageEncoder for TiffEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Tiff
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, WatermarkError> {
        let converted = match image.color() {
            ColorType::La8 => Some(DynamicImage::ImageRgba8(image.to_rgba8())),
            ColorType::La16 => Some(DynamicImage::ImageRgba16(image.to_rgba16())),
            _ => floats_to_sixteen_bit(image),
        };
        write_with(
            converted.as_ref().unwrap_or(image),
            OutputFormat::Tiff,
            ImageOutputFormat::Tiff,
        )
    }
}

/// GIF encoder using the image crate (single frame, palette quantised)
pub struct GifEncoder;

impl ImageEncoder for GifEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Gif
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, WatermarkError> {
        let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
        write_with(&rgba, OutputFormat::Gif, ImageOutputFormat::Gif)
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Png => Box::new(PngEncoder),
            OutputFormat::WebP => Box::new(WebPEncoder),
            OutputFormat::Bmp => Box::new(BmpEncoder),
            OutputFormat::Tiff => Box::new(TiffEncoder),
            OutputFormat::Gif => Box::new(GifEncoder),
        }
    }
}
