//! Template variable substitution for text watermarks.
//!
//! This module provides template resolution for text watermarks, replacing
//! variables like `{{filename}}`, `{{taken}}`, `{{date}}` with values
//! describing the file being watermarked.
//!
//! # Supported Variables
//!
//! - `{{filename}}` - File name with extension
//! - `{{stem}}` - File name without extension
//! - `{{ext}}` - Extension, without the dot
//! - `{{width}}`, `{{height}}` - Source image dimensions in pixels
//! - `{{date}}` - Current date (YYYY-MM-DD)
//! - `{{datetime}}` - Current local date and time (YYYY-MM-DD HH:MM:SS)
//! - `{{taken}}` - EXIF capture date (YYYY-MM-DD), falling back to the
//!   modification date
//! - `{{modified}}` - File modification date (YYYY-MM-DD)
//!
//! Dates use local time.
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::template::{resolve_template, TemplateContext};
//!
//! let mut context = TemplateContext::from_path("photos/IMG_0042.jpg");
//! context.set_dimensions(4000, 3000);
//!
//! let result = resolve_template("{{stem}} ({{width}}x{{height}})", &context);
//! assert_eq!(result, "IMG_0042 (4000x3000)");
//! ```

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

/// Regex pattern for matching template variables: {{variable}}
static TEMPLATE_PATTERN: OnceLock<Regex> = OnceLock::new();

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Gets the compiled template pattern regex.
///
/// The pattern is a constant verified by `test_template_regex_is_valid`.
fn get_template_pattern() -> &'static Regex {
    TEMPLATE_PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").expect("Invalid template regex - this is a compile-time bug")
    })
}

/// Context containing all available values for template substitution.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    filename: Option<String>,
    stem: Option<String>,
    ext: Option<String>,
    dimensions: Option<(u32, u32)>,
    /// EXIF capture time
    taken: Option<NaiveDateTime>,
    modified: Option<DateTime<Local>>,
    /// Fixed "now" (if None, uses current time)
    now: Option<DateTime<Local>>,
}

impl TemplateContext {
    /// Creates a new empty template context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the file name parts and modification time of
    /// `path`. Missing metadata leaves the matching variables empty.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut context = Self::new();

        context.filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        context.stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        context.ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());
        context.modified = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Local>::from);

        context
    }

    /// Reads the EXIF capture date of `path` into the context.
    pub fn load_capture_date(&mut self, path: impl AsRef<Path>) {
        self.taken = read_capture_date(path.as_ref());
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.dimensions = Some((width, height));
    }

    pub fn set_taken(&mut self, taken: NaiveDateTime) {
        self.taken = Some(taken);
    }

    pub fn set_modified(&mut self, modified: DateTime<Local>) {
        self.modified = Some(modified);
    }

    /// Pins the time used for `{{date}}` and `{{datetime}}`.
    pub fn set_now(&mut self, now: DateTime<Local>) {
        self.now = Some(now);
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn taken(&self) -> Option<NaiveDateTime> {
        self.taken
    }

    fn now(&self) -> DateTime<Local> {
        self.now.unwrap_or_else(Local::now)
    }

    /// Capture date, falling back to the modification date.
    fn taken_date(&self) -> Option<NaiveDate> {
        self.taken
            .map(|taken| taken.date())
            .or_else(|| self.modified.map(|modified| modified.date_naive()))
    }
}

/// Resolves all template variables in the given text.
///
/// Variables are specified using `{{variable}}` syntax. Unknown variables
/// or variables with missing values are replaced with an empty string.
///
/// # Arguments
///
/// * `template` - The template string containing variables
/// * `context` - The context containing variable values
///
/// # Returns
///
/// The resolved string with all variables replaced.
pub fn resolve_template(template: &str, context: &TemplateContext) -> String {
    get_template_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            resolve_variable(&caps[1], context)
        })
        .into_owned()
}

/// Resolves a single variable name to its value.
fn resolve_variable(var_name: &str, context: &TemplateContext) -> String {
    let date = |value: Option<NaiveDate>| {
        value
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    };

    match var_name {
        "filename" => context.filename.clone().unwrap_or_default(),
        "stem" => context.stem.clone().unwrap_or_default(),
        "ext" => context.ext.clone().unwrap_or_default(),
        "width" => context
            .dimensions
            .map(|(w, _)| w.to_string())
            .unwrap_or_default(),
        "height" => context
            .dimensions
            .map(|(_, h)| h.to_string())
            .unwrap_or_default(),
        "date" => context.now().format(DATE_FORMAT).to_string(),
        "datetime" => context.now().format(DATETIME_FORMAT).to_string(),
        "taken" => date(context.taken_date()),
        "modified" => date(context.modified.map(|m| m.date_naive())),
        _ => String::new(), // Unknown variable -> empty string
    }
}

/// Returns true if the template contains any `{{variable}}`.
pub fn has_variables(template: &str) -> bool {
    get_template_pattern().is_match(template)
}

/// Returns true if the template references the named variable.
pub fn uses_variable(template: &str, name: &str) -> bool {
    get_template_pattern()
        .captures_iter(template)
        .any(|caps| &caps[1] == name)
}

/// Reads the capture time from EXIF metadata.
///
/// Prefers `DateTimeOriginal`, then `DateTime`. Returns `None` for files
/// without readable EXIF data.
pub fn read_capture_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut reader)
        .ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, exif::In::PRIMARY))
        .find_map(|field| match &field.value {
            exif::Value::Ascii(values) => values.first().and_then(|raw| parse_exif_datetime(raw)),
            _ => None,
        })
}

fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?.and_hms_opt(
        dt.hour as u32,
        dt.minute as u32,
        dt.second as u32,
    )
}
