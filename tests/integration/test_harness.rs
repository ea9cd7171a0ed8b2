// Test harness for integration tests
// Provides fixture directories populated with generated images

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary workspace with an `input/` directory; removed on drop.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir(dir.path().join("input")).expect("create input dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Write a solid RGB image under `input/`, encoded by extension.
    pub fn add_solid(&self, relative: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
        let path = self.input().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
            .save(&path)
            .expect("save fixture image");
        path
    }

    /// Write a gradient RGB image, so every pixel differs.
    pub fn add_gradient(&self, relative: &str, width: u32, height: u32) -> PathBuf {
        let path = self.input().join(relative);
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img).save(&path).expect("save fixture image");
        path
    }

    /// Write arbitrary bytes under `input/`.
    pub fn add_raw(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.input().join(relative);
        std::fs::write(&path, bytes).expect("write fixture file");
        path
    }

    /// Write an opaque solid PNG outside `input/` for use as an image watermark.
    pub fn add_logo(&self, width: u32, height: u32, color: [u8; 4]) -> PathBuf {
        let path = self.dir.path().join("logo.png");
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save_with_format(&path, ImageFormat::Png)
            .expect("save logo");
        path
    }
}

/// All regular files under `dir`, sorted.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Path to the compiled `watermill` binary.
pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_watermill"))
}
