// Batch runs over real directories

use super::test_harness::{files_under, Fixture};
use image::GenericImageView;
use std::path::PathBuf;
use watermill::batch::{self, BatchProcessor, CancelToken, FileStatus};
use watermill::error::ErrorKind;
use watermill::output::{FormatChoice, OutputFormat, OutputOptions, OutputPolicy};
use watermill::watermark::{WatermarkPosition, WatermarkSpec};

fn mirrored(fixture: &Fixture) -> OutputPolicy {
    OutputPolicy::Mirrored {
        output_root: fixture.out(),
        prefix: None,
        suffix: None,
    }
}

#[test]
fn test_centered_sample_text_into_out_dir() {
    let fixture = Fixture::new();
    let sources = [
        fixture.add_solid("a.jpg", 320, 200, [0, 0, 0]),
        fixture.add_solid("b.jpg", 300, 300, [0, 0, 0]),
        fixture.add_solid("c.jpg", 240, 160, [0, 0, 0]),
    ];

    let spec = WatermarkSpec::text("SAMPLE")
        .with_position(WatermarkPosition::Center)
        .with_opacity(0.5)
        .with_font_size(32);
    let summary = batch::run(fixture.input(), spec, mirrored(&fixture)).unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(files_under(&fixture.out()).len(), 3);

    for source in &sources {
        let name = source.file_name().unwrap();
        let output = image::open(fixture.out().join(name)).unwrap();
        let original = image::open(source).unwrap();
        assert_eq!(output.dimensions(), original.dimensions());

        // Mark blended at the centre, edges untouched (allowing for JPEG noise)
        let rgb = output.to_rgb8();
        let (w, h) = rgb.dimensions();
        let centre_max = (h / 2 - 12..h / 2 + 12)
            .flat_map(|y| (w / 2 - 40..w / 2 + 40).map(move |x| (x, y)))
            .map(|(x, y)| rgb.get_pixel(x, y)[0])
            .max()
            .unwrap();
        assert!(centre_max > 80, "no visible mark in {:?}", name);
        assert!(centre_max < 200, "mark not blended in {:?}", name);
        assert!(rgb.get_pixel(2, 2)[0] < 30);
    }
}

#[test]
fn test_corrupt_file_does_not_abort_batch() {
    let fixture = Fixture::new();
    for name in ["1.png", "2.png", "3.png", "4.png"] {
        fixture.add_gradient(name, 64, 48);
    }
    fixture.add_raw("broken.jpg", b"\xFF\xD8\xFF\xE0 truncated jpeg");

    let summary = batch::run(fixture.input(), WatermarkSpec::text("wm"), mirrored(&fixture)).unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].path, fixture.input().join("broken.jpg"));
    assert_eq!(summary.failures[0].kind, ErrorKind::Decode);
    assert_eq!(files_under(&fixture.out()).len(), 4);
}

#[test]
fn test_empty_directory() {
    let fixture = Fixture::new();

    let summary = batch::run(fixture.input(), WatermarkSpec::text("wm"), mirrored(&fixture)).unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert!(!fixture.out().exists());
}

#[test]
fn test_missing_root_is_fatal_and_writes_nothing() {
    let fixture = Fixture::new();
    let missing = fixture.path().join("does-not-exist");

    let err = batch::run(&missing, WatermarkSpec::text("wm"), mirrored(&fixture)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!fixture.out().exists());
}

#[test]
fn test_non_images_are_skipped() {
    let fixture = Fixture::new();
    fixture.add_gradient("photo.png", 32, 32);
    fixture.add_raw("notes.txt", b"hello");
    fixture.add_raw("Thumbs.db", b"\0\0");

    let summary = batch::run(fixture.input(), WatermarkSpec::text("wm"), mirrored(&fixture)).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 2);
}

#[cfg(unix)]
#[test]
fn test_symlinked_images_count_as_skipped() {
    let fixture = Fixture::new();
    let photo = fixture.add_gradient("photo.png", 32, 32);
    std::os::unix::fs::symlink(&photo, fixture.input().join("alias.png")).unwrap();

    let summary = batch::run(fixture.input(), WatermarkSpec::text("wm"), mirrored(&fixture)).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(files_under(&fixture.out()), vec![fixture.out().join("photo.png")]);
}

#[test]
fn test_recursive_run_mirrors_tree() {
    let fixture = Fixture::new();
    fixture.add_solid("top.png", 40, 40, [9, 9, 9]);
    fixture.add_solid("2024/june/deep.png", 40, 40, [9, 9, 9]);

    let flat = BatchProcessor::new(WatermarkSpec::text("wm"), mirrored(&fixture))
        .unwrap()
        .run(fixture.input())
        .unwrap();
    assert_eq!(flat.processed, 1);

    let deep = BatchProcessor::new(WatermarkSpec::text("wm"), mirrored(&fixture))
        .unwrap()
        .recursive(true)
        .run(fixture.input())
        .unwrap();
    assert_eq!(deep.processed, 2);
    assert!(fixture.out().join("2024/june/deep.png").exists());
}

#[test]
fn test_default_output_dir_is_excluded_on_rerun() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 30, 30);
    let policy = OutputPolicy::default_for(&fixture.input());

    let first = BatchProcessor::new(WatermarkSpec::text("wm"), policy.clone())
        .unwrap()
        .recursive(true)
        .run(fixture.input())
        .unwrap();
    let second = BatchProcessor::new(WatermarkSpec::text("wm"), policy)
        .unwrap()
        .recursive(true)
        .run(fixture.input())
        .unwrap();

    assert_eq!(first.processed, 1);
    assert_eq!(second.processed, 1);
    assert_eq!(second.skipped, 0);
    assert!(fixture
        .input()
        .join("input_watermark")
        .join("a.png")
        .exists());
}

#[test]
fn test_suffixed_output_with_format_conversion() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 30, 20);
    fixture.add_gradient("b.bmp", 30, 20);

    let summary = BatchProcessor::new(
        WatermarkSpec::text("wm"),
        OutputPolicy::Suffixed {
            suffix: "_wm".into(),
        },
    )
    .unwrap()
    .with_output_options(OutputOptions {
        format: FormatChoice::Convert(OutputFormat::Jpeg),
        jpeg_quality: 85,
    })
    .run(fixture.input())
    .unwrap();

    assert_eq!(summary.processed, 2);
    let mut written = summary.written.clone();
    written.sort();
    assert_eq!(
        written,
        vec![fixture.input().join("a_wm.jpg"), fixture.input().join("b_wm.jpg")]
    );
    let data = std::fs::read(fixture.input().join("a_wm.jpg")).unwrap();
    assert_eq!(image::guess_format(&data).unwrap(), image::ImageFormat::Jpeg);
}

#[test]
fn test_in_place_overwrites_sources() {
    let fixture = Fixture::new();
    let source = fixture.add_solid("a.png", 60, 40, [0, 0, 0]);
    let before = std::fs::read(&source).unwrap();

    let spec = WatermarkSpec::text("X")
        .with_position(WatermarkPosition::Center)
        .with_opacity(1.0);
    let summary = batch::run(fixture.input(), spec, OutputPolicy::InPlace).unwrap();

    assert_eq!(summary.written, vec![source.clone()]);
    assert_ne!(std::fs::read(&source).unwrap(), before);
    assert_eq!(files_under(&fixture.input()), vec![source]);
}

#[test]
fn test_template_text_renders_per_file() {
    let fixture = Fixture::new();
    fixture.add_solid("one.png", 200, 60, [0, 0, 0]);
    fixture.add_solid("a-much-longer-name.png", 200, 60, [0, 0, 0]);

    let spec = WatermarkSpec::text("{{stem}}")
        .with_position(WatermarkPosition::TopLeft)
        .with_margin(0)
        .with_opacity(1.0);
    let summary = batch::run(fixture.input(), spec, mirrored(&fixture)).unwrap();
    assert_eq!(summary.processed, 2);

    let lit = |name: &str| -> u32 {
        let img = image::open(fixture.out().join(name)).unwrap().to_rgb8();
        (0..200).filter(|&x| (0..60).any(|y| img.get_pixel(x, y)[0] > 0)).max().unwrap_or(0)
    };
    // Longer text reaches further right
    assert!(lit("a-much-longer-name.png") > lit("one.png"));
}

#[test]
fn test_parallel_matches_sequential() {
    let fixture = Fixture::new();
    for i in 0..6 {
        fixture.add_gradient(&format!("img{}.png", i), 80, 50);
    }
    fixture.add_raw("bad.png", b"nope");

    let spec = WatermarkSpec::text("parallel").with_position(WatermarkPosition::Tiled);
    let seq_out = fixture.path().join("seq");
    let par_out = fixture.path().join("par");

    let sequential = BatchProcessor::new(
        spec.clone(),
        OutputPolicy::Mirrored {
            output_root: seq_out.clone(),
            prefix: None,
            suffix: None,
        },
    )
    .unwrap()
    .run(fixture.input())
    .unwrap();

    let parallel = BatchProcessor::new(
        spec,
        OutputPolicy::Mirrored {
            output_root: par_out.clone(),
            prefix: None,
            suffix: None,
        },
    )
    .unwrap()
    .jobs(4)
    .run(fixture.input())
    .unwrap();

    assert_eq!(sequential.processed, 6);
    assert_eq!(parallel.processed, 6);
    assert_eq!(parallel.failed, 1);

    let names = |written: &[PathBuf]| -> Vec<_> {
        written.iter().map(|p| p.file_name().unwrap().to_owned()).collect()
    };
    // Summary order follows path order regardless of scheduling
    assert_eq!(names(&sequential.written[..]), names(&parallel.written[..]));

    for i in 0..6 {
        let name = format!("img{}.png", i);
        let a = image::open(seq_out.join(&name)).unwrap();
        let b = image::open(par_out.join(&name)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}

#[test]
fn test_cancellation_skips_remaining_files() {
    let fixture = Fixture::new();
    for i in 0..5 {
        fixture.add_gradient(&format!("{}.png", i), 40, 40);
    }

    let token = CancelToken::new();
    let trigger = token.clone();
    let summary = BatchProcessor::new(WatermarkSpec::text("wm"), mirrored(&fixture))
        .unwrap()
        .cancel_token(token)
        .on_progress(move |progress| {
            if progress.done == 2 {
                trigger.cancel();
            }
            assert!(!matches!(progress.outcome.status, FileStatus::Failed(_)));
        })
        .run(fixture.input())
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 3);
    assert_eq!(files_under(&fixture.out()).len(), 2);
}

#[test]
fn test_invalid_watermark_image_fails_before_any_file() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 10, 10);

    let err = BatchProcessor::new(
        WatermarkSpec::image(fixture.path().join("missing-logo.png")),
        mirrored(&fixture),
    )
    .unwrap_err();

    assert!(err.is_fatal());
    assert!(!fixture.out().exists());
}
