// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.

// =============================================================================
// Watermark defaults
// =============================================================================

/// Default font size in pixels
pub const DEFAULT_FONT_SIZE: u32 = 24;

/// Default watermark color
pub const DEFAULT_COLOR: &str = "white";

/// Default watermark opacity (0.0 - 1.0)
pub const DEFAULT_OPACITY: f32 = 0.5;

/// Default distance from the image edges in pixels
pub const DEFAULT_MARGIN: u32 = 20;

/// Default rotation in degrees
pub const DEFAULT_ROTATION_DEGREES: f32 = 0.0;

/// Largest watermark raster (width x height) that will be allocated
pub const MAX_WATERMARK_PIXELS: u64 = 8192 * 8192;

// =============================================================================
// Input defaults
// =============================================================================

/// Extensions recognised as image candidates (lowercase, without dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "gif", "webp"];

// =============================================================================
// Output defaults
// =============================================================================

/// Default JPEG quality (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Appended to the input directory name to form the default output directory
pub const DEFAULT_OUTPUT_DIR_SUFFIX: &str = "_watermark";

/// Prefix for temporary files created next to a destination before rename
pub const TEMP_FILE_PREFIX: &str = ".watermill-";

// =============================================================================
// Execution defaults
// =============================================================================

/// Default number of worker threads (1 = sequential)
pub const DEFAULT_JOBS: usize = 1;

/// Upper bound for the worker pool size
pub const MAX_JOBS: usize = 64;
