// Input discovery

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::WatermarkError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Why a walked entry was not yielded as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not in the image allow-list
    NotAnImage,
    /// Symbolic link; links are never followed
    Symlink,
    /// The walk could not read the entry
    Unreadable(String),
}

/// A file seen while walking the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedEntry {
    Image(PathBuf),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// Walks an input directory for candidate images.
///
/// Files are classified by extension only; nothing is opened. Symlinks are
/// not followed. Hidden directories are walked like any other.
#[derive(Debug, Clone)]
pub struct ImageLocator {
    root: PathBuf,
    recursive: bool,
    excluded: Vec<PathBuf>,
}

impl ImageLocator {
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Result<Self, WatermarkError> {
        let root = root.into();
        if !root.exists() {
            return Err(WatermarkError::config(format!(
                "Input directory {} does not exist",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(WatermarkError::config(format!(
                "Input path {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            recursive,
            excluded: Vec::new(),
        })
    }

    /// Never descend into `dir`.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Every file under the root, classified. Each call walks afresh.
    pub fn entries(&self) -> impl Iterator<Item = LocatedEntry> {
        let excluded: Vec<PathBuf> = self
            .excluded
            .iter()
            .map(|dir| std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone()))
            .collect();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(if self.recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name();

        walker
            .into_iter()
            .filter_entry(move |entry| {
                !(entry.file_type().is_dir() && is_excluded(entry.path(), &excluded))
            })
            .filter_map(|result| match result {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.into_path();
                    if is_image_path(&path) {
                        Some(LocatedEntry::Image(path))
                    } else {
                        Some(LocatedEntry::Skipped {
                            path,
                            reason: SkipReason::NotAnImage,
                        })
                    }
                }
                Ok(entry) if entry.path_is_symlink() => Some(LocatedEntry::Skipped {
                    path: entry.into_path(),
                    reason: SkipReason::Symlink,
                }),
                Ok(_) => None,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    tracing::warn!(path = %path.display(), error = %err, "Cannot read directory entry");
                    Some(LocatedEntry::Skipped {
                        path,
                        reason: SkipReason::Unreadable(err.to_string()),
                    })
                }
            })
    }

    /// Image paths only.
    pub fn locate(&self) -> impl Iterator<Item = PathBuf> {
        self.entries().filter_map(|entry| match entry {
            LocatedEntry::Image(path) => Some(path),
            LocatedEntry::Skipped { .. } => None,
        })
    }
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    if excluded.iter().any(|dir| dir == path) {
        return true;
    }
    match std::fs::canonicalize(path) {
        Ok(canonical) => excluded.iter().any(|dir| *dir == canonical),
        Err(_) => false,
    }
}

/// Whether `path` has an image extension (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Collect image paths under `root`.
pub fn locate(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, WatermarkError> {
    Ok(ImageLocator::new(root, recursive)?.locate().collect())
}
