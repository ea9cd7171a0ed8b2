// Command-line interface

use crate::config::Overrides;
use crate::constants::MAX_JOBS;
use crate::logging::{LogFormat, LogOptions};
use crate::output::FormatChoice;
use crate::watermark::{WatermarkPosition, WatermarkSource};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// How the run summary is printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Watermill - batch watermarking for directories of images
#[derive(Parser, Debug, Clone)]
#[command(name = "watermill")]
#[command(version, about, long_about = None)]
#[command(args_override_self = true, allow_negative_numbers = true)]
pub struct Args {
    /// Directory containing the images to watermark
    pub input: PathBuf,

    /// Watermark text; supports {{filename}}, {{taken}}, {{date}} and other variables
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Image file to use as the watermark
    #[arg(long, value_name = "PATH")]
    pub watermark_image: Option<PathBuf>,

    /// Scale factor for the watermark image
    #[arg(long, value_name = "FACTOR")]
    pub image_scale: Option<f32>,

    /// Font family name or font file path
    #[arg(long, value_name = "FAMILY|PATH")]
    pub font: Option<String>,

    /// Font size in pixels
    #[arg(long, value_name = "PX")]
    pub font_size: Option<u32>,

    /// Text colour: name, #RRGGBB[AA] or r,g,b[,a]
    #[arg(long, value_name = "COLOR")]
    pub color: Option<String>,

    /// Placement: top-left, top-center, top-right, center-left, center,
    /// center-right, bottom-left, bottom-center, bottom-right or tiled
    #[arg(long, value_name = "POSITION")]
    pub position: Option<WatermarkPosition>,

    /// Opacity from 0.0 to 1.0
    #[arg(long, value_name = "ALPHA")]
    pub opacity: Option<f32>,

    /// Distance from the image edges in pixels
    #[arg(long, value_name = "PX")]
    pub margin: Option<u32>,

    /// Clockwise rotation in degrees
    #[arg(long, value_name = "DEGREES")]
    pub rotate: Option<f32>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Write outputs under this directory, mirroring the input tree
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prepend this prefix to the name of each output file
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Insert this suffix before the extension of each output file
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Overwrite the source images
    #[arg(long, conflicts_with_all = ["output_dir", "prefix", "suffix"])]
    pub in_place: bool,

    /// Output format: preserve, jpeg, png, webp, bmp, tiff or gif
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<FormatChoice>,

    /// JPEG quality (1-100)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Number of worker threads
    #[arg(
        short,
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_JOBS as u64)
    )]
    pub jobs: Option<usize>,

    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Summary format printed on stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Set when --watermark-image appeared after --text
    #[arg(skip)]
    pub image_after_text: bool,
}

impl Args {
    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_args() -> Self {
        Self::try_parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args`. When both a text and an image watermark are given, the
    /// later one on the command line wins.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut parsed = Self::from_arg_matches(&matches)?;
        parsed.image_after_text = image_after_text(&matches);
        Ok(parsed)
    }

    /// The watermark source chosen on the command line, if any.
    pub fn source(&self) -> Option<WatermarkSource> {
        let text = self.text.clone().map(WatermarkSource::text);
        let image = self.watermark_image.clone().map(|path| WatermarkSource::Image {
            path,
            scale: self.image_scale,
        });

        match (text, image) {
            (Some(text), Some(image)) => Some(if self.image_after_text { image } else { text }),
            (text, image) => text.or(image),
        }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source(),
            image_scale: self.image_scale,
            font_family: self.font.clone(),
            font_size: self.font_size,
            color: self.color.clone(),
            opacity: self.opacity,
            position: self.position,
            margin: self.margin,
            rotation_degrees: self.rotate,
            recursive: self.recursive.then_some(true),
            output_dir: self.output_dir.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            in_place: self.in_place.then_some(true),
            format: self.format.map(|f| f.to_string()),
            jpeg_quality: self.quality,
            jobs: self.jobs,
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            format: self.log_format,
            verbosity: self.verbose,
        }
    }
}

fn image_after_text(matches: &ArgMatches) -> bool {
    match (matches.index_of("text"), matches.index_of("watermark_image")) {
        (Some(text), Some(image)) => image > text,
        _ => false,
    }
}
