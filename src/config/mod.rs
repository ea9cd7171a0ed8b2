// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::BatchProcessor;
use crate::constants::{
    DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_JOBS, DEFAULT_JPEG_QUALITY, DEFAULT_MARGIN,
    DEFAULT_OPACITY, DEFAULT_ROTATION_DEGREES, MAX_JOBS,
};
use crate::error::WatermarkError;
use crate::output::{FormatChoice, OutputOptions, OutputPolicy};
use crate::watermark::{parse_color, WatermarkPosition, WatermarkSource, WatermarkSpec};

/// Run configuration as read from a YAML file.
///
/// Every section is optional; command-line [`Overrides`] are layered on top
/// before the run is resolved.
///
/// ```yaml
/// watermark:
///   source:
///     type: text
///     text: "(c) ${PHOTOGRAPHER} {{taken}}"
///   font_size: 32
///   color: "#FFFFFFCC"
///   position: bottom-right
/// output:
///   dir: "/srv/photos/marked"
///   format: jpeg
///   jpeg_quality: 90
/// input:
///   recursive: true
///   jobs: 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Text or image; may instead come from the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<WatermarkSource>,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Font family name or font file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    /// Colour name, `#RGB`, `#RRGGBB`, `#RRGGBBAA` or `r,g,b[,a]`
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_opacity")]
    pub opacity: f32,

    #[serde(default)]
    pub position: WatermarkPosition,

    #[serde(default = "default_margin")]
    pub margin: u32,

    #[serde(default = "default_rotation_degrees")]
    pub rotation_degrees: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            source: None,
            font_size: default_font_size(),
            font_family: None,
            color: default_color(),
            opacity: default_opacity(),
            position: WatermarkPosition::default(),
            margin: default_margin(),
            rotation_degrees: default_rotation_degrees(),
        }
    }
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}

fn default_margin() -> u32 {
    DEFAULT_MARGIN
}

fn default_rotation_degrees() -> f32 {
    DEFAULT_ROTATION_DEGREES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Mirror the input tree under this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Prepended to the file stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Inserted between file stem and extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Overwrite source files
    #[serde(default)]
    pub in_place: bool,

    /// `preserve` or an output format name
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: None,
            suffix: None,
            in_place: false,
            format: default_format(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_format() -> String {
    FormatChoice::Preserve.to_string()
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub recursive: bool,

    /// Worker threads; 1 processes files sequentially
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> usize {
    DEFAULT_JOBS
}

/// Settings given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub source: Option<WatermarkSource>,
    pub image_scale: Option<f32>,
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub color: Option<String>,
    pub opacity: Option<f32>,
    pub position: Option<WatermarkPosition>,
    pub margin: Option<u32>,
    pub rotation_degrees: Option<f32>,
    pub recursive: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub in_place: Option<bool>,
    pub format: Option<String>,
    pub jpeg_quality: Option<u8>,
    pub jobs: Option<usize>,
}

/// Everything a batch run needs, resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub spec: WatermarkSpec,
    pub policy: OutputPolicy,
    pub output_options: OutputOptions,
    pub recursive: bool,
    pub jobs: usize,
}

impl RunPlan {
    /// Build the processor for this plan.
    pub fn into_processor(self) -> Result<BatchProcessor, WatermarkError> {
        Ok(BatchProcessor::new(self.spec, self.policy)?
            .with_output_options(self.output_options)
            .recursive(self.recursive)
            .jobs(self.jobs))
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Check values that do not depend on the input directory.
    pub fn validate(&self) -> Result<(), String> {
        let wm = &self.watermark;

        if wm.font_size == 0 {
            return Err("Font size must be greater than 0".to_string());
        }

        if !wm.opacity.is_finite() || !(0.0..=1.0).contains(&wm.opacity) {
            return Err(format!(
                "Watermark opacity must be between 0.0 and 1.0, got {}",
                wm.opacity
            ));
        }

        if !wm.rotation_degrees.is_finite() {
            return Err("Watermark rotation must be a finite number of degrees".to_string());
        }

        parse_color(&wm.color).map_err(|e| e.to_string())?;

        let out = &self.output;
        let renamed = out.prefix.is_some() || out.suffix.is_some();
        if out.in_place && (out.dir.is_some() || renamed) {
            return Err(
                "In-place output cannot be combined with an output directory, prefix or suffix"
                    .to_string(),
            );
        }

        if out.dir.is_none() && out.prefix.is_some() && out.suffix.is_some() {
            return Err(
                "Output next to the sources takes either a prefix or a suffix, not both"
                    .to_string(),
            );
        }

        for (what, value) in [("prefix", &out.prefix), ("suffix", &out.suffix)] {
            match value {
                Some(value) if value.is_empty() => {
                    return Err(format!("Output {} cannot be empty", what));
                }
                Some(value) if value.contains(['/', '\\']) => {
                    return Err(format!(
                        "Output {} '{}' cannot contain path separators",
                        what, value
                    ));
                }
                _ => {}
            }
        }

        if !(1..=100).contains(&out.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                out.jpeg_quality
            ));
        }

        out.format
            .parse::<FormatChoice>()
            .map_err(|e| e.to_string())?;

        if self.input.jobs == 0 || self.input.jobs > MAX_JOBS {
            return Err(format!(
                "Jobs must be between 1 and {}, got {}",
                MAX_JOBS, self.input.jobs
            ));
        }

        Ok(())
    }

    /// Layer command-line settings over the file's.
    ///
    /// An output destination given on the command line replaces the file's
    /// destination as a whole, so `--in-place` overrides a configured
    /// directory and vice versa.
    pub fn apply(&mut self, overrides: Overrides) {
        let wm = &mut self.watermark;

        if let Some(source) = overrides.source {
            wm.source = Some(source);
        }
        if let Some(factor) = overrides.image_scale {
            if let Some(WatermarkSource::Image { scale, .. }) = &mut wm.source {
                *scale = Some(factor);
            }
        }
        if overrides.font_family.is_some() {
            wm.font_family = overrides.font_family;
        }
        if let Some(size) = overrides.font_size {
            wm.font_size = size;
        }
        if let Some(color) = overrides.color {
            wm.color = color;
        }
        if let Some(opacity) = overrides.opacity {
            wm.opacity = opacity;
        }
        if let Some(position) = overrides.position {
            wm.position = position;
        }
        if let Some(margin) = overrides.margin {
            wm.margin = margin;
        }
        if let Some(degrees) = overrides.rotation_degrees {
            wm.rotation_degrees = degrees;
        }

        let out = &mut self.output;
        let destination_given = overrides.output_dir.is_some()
            || overrides.prefix.is_some()
            || overrides.suffix.is_some()
            || overrides.in_place == Some(true);
        if destination_given {
            out.dir = overrides.output_dir;
            out.prefix = overrides.prefix;
            out.suffix = overrides.suffix;
            out.in_place = overrides.in_place.unwrap_or(false);
        }
        if let Some(format) = overrides.format {
            out.format = format;
        }
        if let Some(quality) = overrides.jpeg_quality {
            out.jpeg_quality = quality;
        }

        if let Some(recursive) = overrides.recursive {
            self.input.recursive = recursive;
        }
        if let Some(jobs) = overrides.jobs {
            self.input.jobs = jobs;
        }
    }

    /// Resolve into a validated run plan for `input_root`.
    pub fn resolve(&self, input_root: &Path) -> Result<RunPlan, WatermarkError> {
        self.validate().map_err(WatermarkError::config)?;

        let wm = &self.watermark;
        let source = wm.source.clone().ok_or_else(|| {
            WatermarkError::config(
                "No watermark source given; set a text or an image watermark",
            )
        })?;

        let spec = WatermarkSpec {
            source,
            font_size: wm.font_size,
            font_family: wm.font_family.clone(),
            color: parse_color(&wm.color)?,
            opacity: wm.opacity,
            position: wm.position,
            margin: wm.margin,
            rotation_degrees: wm.rotation_degrees,
        };
        spec.validate().map_err(WatermarkError::config)?;

        let out = &self.output;
        let policy = if out.in_place {
            OutputPolicy::InPlace
        } else if let Some(dir) = &out.dir {
            OutputPolicy::Mirrored {
                output_root: dir.clone(),
                prefix: out.prefix.clone(),
                suffix: out.suffix.clone(),
            }
        } else if let Some(prefix) = &out.prefix {
            OutputPolicy::Prefixed {
                prefix: prefix.clone(),
            }
        } else if let Some(suffix) = &out.suffix {
            OutputPolicy::Suffixed {
                suffix: suffix.clone(),
            }
        } else {
            OutputPolicy::default_for(input_root)
        };

        Ok(RunPlan {
            spec,
            policy,
            output_options: OutputOptions {
                format: out.format.parse()?,
                jpeg_quality: out.jpeg_quality,
            },
            recursive: self.input.recursive,
            jobs: self.input.jobs,
        })
    }
}
