//! Output placement and persistence.
//!
//! [`OutputWriter`] decides where each watermarked image goes
//! ([`OutputPolicy`]), encodes it ([`encoder`]) and writes it atomically:
//! data lands in a temporary file in the destination directory and is renamed
//! over the destination only once fully written. A failed or interrupted
//! write never leaves a partial output behind.
//!
//! # Policies
//!
//! - `InPlace`: overwrite the source file
//! - `Prefixed`: `<prefix><stem>.<ext>` next to the source
//! - `Suffixed`: `<stem><suffix>.<ext>` next to the source
//! - `Mirrored`: `<output_root>/<relative dir>/[prefix]<stem>[suffix].<ext>`

pub mod encoder;
pub mod format;

pub use encoder::{EncoderFactory, ImageEncoder};
pub use format::{FormatChoice, OutputFormat};

use crate::constants::{DEFAULT_JPEG_QUALITY, DEFAULT_OUTPUT_DIR_SUFFIX, TEMP_FILE_PREFIX};
use crate::error::WatermarkError;
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where watermarked images are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Overwrite the source
    InPlace,
    /// Write next to the source with a prefix before the stem
    Prefixed { prefix: String },
    /// Write next to the source with a suffix before the extension
    Suffixed { suffix: String },
    /// Recreate the input tree under another directory
    Mirrored {
        output_root: PathBuf,
        prefix: Option<String>,
        suffix: Option<String>,
    },
}

impl OutputPolicy {
    /// Mirror into `<root>/<root name>_watermark`.
    pub fn default_for(input_root: &Path) -> Self {
        let name = std::fs::canonicalize(input_root)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .or_else(|| {
                input_root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "images".to_string());

        Self::Mirrored {
            output_root: input_root.join(format!("{}{}", name, DEFAULT_OUTPUT_DIR_SUFFIX)),
            prefix: None,
            suffix: None,
        }
    }

    /// Directory the locator must not descend into.
    pub fn excluded_dir(&self) -> Option<&Path> {
        match self {
            Self::Mirrored { output_root, .. } => Some(output_root),
            _ => None,
        }
    }

    /// Validate the policy against the input root.
    pub fn validate(&self, input_root: &Path) -> Result<(), WatermarkError> {
        match self {
            Self::InPlace => Ok(()),
            Self::Prefixed { prefix } => validate_affix("prefix", prefix),
            Self::Suffixed { suffix } => validate_affix("suffix", suffix),
            Self::Mirrored {
                output_root,
                prefix,
                suffix,
            } => {
                if let Some(prefix) = prefix {
                    validate_affix("prefix", prefix)?;
                }
                if let Some(suffix) = suffix {
                    validate_affix("suffix", suffix)?;
                }
                if output_root.as_os_str().is_empty() {
                    return Err(WatermarkError::config("Output directory cannot be empty"));
                }
                if output_root.exists() && !output_root.is_dir() {
                    return Err(WatermarkError::config(format!(
                        "Output path {} exists and is not a directory",
                        output_root.display()
                    )));
                }
                if same_directory(output_root, input_root) {
                    return Err(WatermarkError::config(format!(
                        "Output directory {} is the input directory; use in-place output to overwrite sources",
                        output_root.display()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A file name prefix or suffix must be non-empty and stay in one directory.
fn validate_affix(what: &str, value: &str) -> Result<(), WatermarkError> {
    if value.is_empty() {
        return Err(WatermarkError::config(format!(
            "Output {} cannot be empty",
            what
        )));
    }
    if value.contains(['/', '\\']) {
        return Err(WatermarkError::config(format!(
            "Output {} '{}' cannot contain path separators",
            what, value
        )));
    }
    Ok(())
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Encoding options shared by every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: FormatChoice,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: FormatChoice::Preserve,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Computes destinations and writes encoded images.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    policy: OutputPolicy,
    options: OutputOptions,
}

impl OutputWriter {
    pub fn new(policy: OutputPolicy, options: OutputOptions) -> Self {
        Self { policy, options }
    }

    pub fn policy(&self) -> &OutputPolicy {
        &self.policy
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Validate policy and options for a run over `input_root`.
    pub fn validate(&self, input_root: &Path) -> Result<(), WatermarkError> {
        self.policy.validate(input_root)?;

        if !(1..=100).contains(&self.options.jpeg_quality) {
            return Err(WatermarkError::config(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.options.jpeg_quality
            )));
        }

        if self.policy == OutputPolicy::InPlace {
            if let FormatChoice::Convert(format) = self.options.format {
                return Err(WatermarkError::config(format!(
                    "In-place output cannot convert to {}; choose an output directory, prefix or suffix",
                    format
                )));
            }
        }

        Ok(())
    }

    /// Compute the destination path for `source`, found under `input_root`.
    pub fn destination(&self, source: &Path, input_root: &Path) -> Result<PathBuf, WatermarkError> {
        let (prefix, suffix) = match &self.policy {
            OutputPolicy::InPlace => return Ok(source.to_path_buf()),
            OutputPolicy::Prefixed { prefix } => (Some(prefix.as_str()), None),
            OutputPolicy::Suffixed { suffix } => (None, Some(suffix.as_str())),
            OutputPolicy::Mirrored { prefix, suffix, .. } => {
                (prefix.as_deref(), suffix.as_deref())
            }
        };

        let file_name = self.file_name(source, prefix, suffix)?;

        match &self.policy {
            OutputPolicy::Mirrored { output_root, .. } => {
                let relative = source.strip_prefix(input_root).map_err(|_| {
                    WatermarkError::write(format!(
                        "{} is not under {}",
                        source.display(),
                        input_root.display()
                    ))
                })?;
                let relative_dir = relative.parent().unwrap_or_else(|| Path::new(""));
                Ok(output_root.join(relative_dir).join(file_name))
            }
            _ => Ok(source.with_file_name(file_name)),
        }
    }

    /// `[prefix]<stem>[suffix].<ext>`; the extension follows the output
    /// format when it changes, and is kept verbatim otherwise.
    fn file_name(
        &self,
        source: &Path,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<String, WatermarkError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                WatermarkError::write(format!("{} has no file name", source.display()))
            })?;

        let extension = match self.options.format {
            FormatChoice::Convert(format)
                if OutputFormat::from_path(source) != Some(format) =>
            {
                format.extension().to_string()
            }
            _ => source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.fallback_extension()),
        };

        Ok(format!(
            "{}{}{}.{}",
            prefix.unwrap_or_default(),
            stem,
            suffix.unwrap_or_default(),
            extension
        ))
    }

    fn fallback_extension(&self) -> String {
        match self.options.format {
            FormatChoice::Convert(format) => format.extension().to_string(),
            FormatChoice::Preserve => OutputFormat::Png.extension().to_string(),
        }
    }

    /// Encode `image` and write it to its destination. Returns the written
    /// path.
    pub fn write(
        &self,
        image: &DynamicImage,
        source: &Path,
        input_root: &Path,
    ) -> Result<PathBuf, WatermarkError> {
        let destination = self.destination(source, input_root)?;
        self.write_to(image, source, &destination)?;
        Ok(destination)
    }

    /// Encode `image` in the format chosen for `source` and atomically
    /// replace `destination` with it.
    pub fn write_to(
        &self,
        image: &DynamicImage,
        source: &Path,
        destination: &Path,
    ) -> Result<(), WatermarkError> {
        let format = self.options.format.resolve(source)?;
        let data = EncoderFactory::create(format).encode(image, self.options.jpeg_quality)?;
        persist_atomically(&data, source, destination)
    }
}

/// Write `data` to a temporary file beside `destination`, then rename it into
/// place. The source's permissions are carried over.
fn persist_atomically(data: &[u8], source: &Path, destination: &Path) -> Result<(), WatermarkError> {
    let dir = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir).map_err(|e| {
        WatermarkError::write(format!("Cannot create directory {}: {}", dir.display(), e))
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| {
            WatermarkError::write(format!(
                "Cannot create temporary file in {}: {}",
                dir.display(),
                e
            ))
        })?;

    temp.write_all(data)
        .and_then(|_| temp.flush())
        .map_err(|e| {
            WatermarkError::write(format!("Cannot write {}: {}", destination.display(), e))
        })?;

    if let Ok(metadata) = std::fs::metadata(source) {
        // Best effort: a failure here still leaves a readable output
        let _ = temp.as_file().set_permissions(metadata.permissions());
    }

    temp.persist(destination).map_err(|e| {
        WatermarkError::write(format!(
            "Cannot move output into place at {}: {}",
            destination.display(),
            e.error
        ))
    })?;

    Ok(())
}
