//! Font loading for text watermarks.
//!
//! A font is chosen once per run. `font_family` may name a font file
//! directly (`.ttf`, `.otf`, `.ttc`) or a family that is looked up by file
//! name in the platform font directories. Lookup ignores case, spaces,
//! dashes and underscores, so `"DejaVu Sans"` finds `DejaVuSans.ttf`.
//!
//! When nothing is requested, or a family cannot be found, the embedded
//! DejaVu Sans Mono is used.

use crate::error::WatermarkError;
use ab_glyph::FontArc;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Embedded font data (DejaVu Sans Mono, see LICENSE-DejaVu).
/// Monospace keeps width calculations predictable.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Font directories are shallow in practice; this bounds pathological trees.
const MAX_FONT_DIR_DEPTH: usize = 6;

/// Load the embedded default font.
pub fn embedded_font() -> Result<FontArc, WatermarkError> {
    FontArc::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| WatermarkError::render(format!("Embedded font is invalid: {}", e)))
}

/// Resolve the font for a run.
///
/// - `None` or blank: embedded font
/// - a path (has a font extension or a path separator): that file, which must
///   exist and parse
/// - otherwise: a family searched in [`font_directories`], falling back to the
///   embedded font with a warning
pub fn load_font(family: Option<&str>) -> Result<FontArc, WatermarkError> {
    let Some(family) = family.map(str::trim).filter(|f| !f.is_empty()) else {
        return embedded_font();
    };

    if looks_like_path(family) {
        return load_font_file(Path::new(family));
    }

    match find_font_in(&font_directories(), family) {
        Some(path) => match load_font_file(&path) {
            Ok(font) => {
                tracing::debug!(family = %family, path = %path.display(), "Loaded system font");
                Ok(font)
            }
            Err(e) => {
                tracing::warn!(
                    family = %family,
                    path = %path.display(),
                    error = %e,
                    "System font could not be loaded, using embedded font"
                );
                embedded_font()
            }
        },
        None => {
            tracing::warn!(family = %family, "Font not found, using embedded font");
            embedded_font()
        }
    }
}

/// Load a font from an explicit file path.
pub fn load_font_file(path: &Path) -> Result<FontArc, WatermarkError> {
    let data = std::fs::read(path).map_err(|e| {
        WatermarkError::config(format!("Cannot read font file {}: {}", path.display(), e))
    })?;

    FontArc::try_from_vec(data).map_err(|e| {
        WatermarkError::config(format!("Invalid font file {}: {}", path.display(), e))
    })
}

fn looks_like_path(value: &str) -> bool {
    let path = Path::new(value);
    path.components().count() > 1 || has_font_extension(path)
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Platform font directories, in search order.
pub fn font_directories() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let home = std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "windows") {
        if let Some(windir) = std::env::var_os("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft").join("Windows").join("Fonts"));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = &home {
            dirs.push(home.join("Library").join("Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = &home {
            dirs.push(home.join(".local").join("share").join("fonts"));
            dirs.push(home.join(".fonts"));
        }
    }

    dirs
}

/// Search `dirs` for a font file whose name matches `family`.
///
/// An exact stem match wins, then `<family>Regular`, then the shortest stem
/// starting with the family name.
pub fn find_font_in(dirs: &[PathBuf], family: &str) -> Option<PathBuf> {
    let wanted = normalize(family);
    if wanted.is_empty() {
        return None;
    }
    let wanted_regular = format!("{}regular", wanted);

    let mut regular_match: Option<PathBuf> = None;
    let mut prefix_match: Option<(usize, PathBuf)> = None;

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        let files = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(MAX_FONT_DIR_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_font_extension(entry.path()));

        for entry in files {
            let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let stem = normalize(stem);

            if stem == wanted {
                return Some(entry.into_path());
            }

            if stem == wanted_regular {
                if regular_match.is_none() {
                    regular_match = Some(entry.into_path());
                }
            } else if stem.starts_with(&wanted) {
                let shorter = prefix_match
                    .as_ref()
                    .map(|(len, _)| stem.len() < *len)
                    .unwrap_or(true);
                if shorter {
                    prefix_match = Some((stem.len(), entry.into_path()));
                }
            }
        }
    }

    regular_match.or_else(|| prefix_match.map(|(_, path)| path))
}
