// Configuration loading and layering tests

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use watermill::cli::Args;
use watermill::config::{Config, Overrides};
use watermill::output::{FormatChoice, OutputFormat, OutputPolicy};
use watermill::watermark::{Color, WatermarkPosition, WatermarkSource};

#[test]
fn test_full_config_file_resolves_to_plan() {
    // Scenario: every section present, values differ from the defaults
    let mut temp_file = NamedTempFile::new().unwrap();
    let config_yaml = r##"
watermark:
  source:
    type: text
    text: "(c) ACME {{taken}}"
  font_size: 36
  color: "#00000080"
  opacity: 0.8
  position: top-center
  margin: 12
  rotation_degrees: -15
output:
  dir: "/tmp/watermill-out"
  suffix: "-wm"
  format: png
  jpeg_quality: 70
input:
  recursive: true
  jobs: 8
"##;
    temp_file.write_all(config_yaml.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    config.validate().unwrap();
    let plan = config.resolve(Path::new("/tmp/watermill-in")).unwrap();

    assert_eq!(plan.spec.source, WatermarkSource::text("(c) ACME {{taken}}"));
    assert_eq!(plan.spec.font_size, 36);
    assert_eq!(plan.spec.color, Color::rgba(0, 0, 0, 0x80));
    assert_eq!(plan.spec.opacity, 0.8);
    assert_eq!(plan.spec.position, WatermarkPosition::TopCenter);
    assert_eq!(plan.spec.margin, 12);
    assert_eq!(plan.spec.rotation_degrees, -15.0);
    assert_eq!(
        plan.policy,
        OutputPolicy::Mirrored {
            output_root: PathBuf::from("/tmp/watermill-out"),
            prefix: None,
            suffix: Some("-wm".into()),
        }
    );
    assert_eq!(plan.output_options.format, FormatChoice::Convert(OutputFormat::Png));
    assert_eq!(plan.output_options.jpeg_quality, 70);
    assert!(plan.recursive);
    assert_eq!(plan.jobs, 8);
}

#[test]
fn test_unknown_source_type_is_rejected() {
    let yaml = r#"
watermark:
  source:
    type: video
    path: clip.mp4
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_cli_in_place_overrides_configured_directory() {
    let mut config = Config::from_yaml_with_env(
        r#"
watermark:
  source: { type: text, text: "x" }
output:
  dir: marked
"#,
    )
    .unwrap();

    let args = Args::try_parse_args(["watermill", "photos", "--in-place"]).unwrap();
    config.apply(args.overrides());

    let plan = config.resolve(Path::new("photos")).unwrap();
    assert_eq!(plan.policy, OutputPolicy::InPlace);
}

#[test]
fn test_cli_source_overrides_file_source() {
    let mut config = Config::from_yaml_with_env(
        "watermark:\n  source:\n    type: text\n    text: from file\n",
    )
    .unwrap();

    let args = Args::try_parse_args([
        "watermill",
        "photos",
        "--watermark-image",
        "logo.png",
        "--image-scale",
        "0.3",
    ])
    .unwrap();
    config.apply(args.overrides());

    assert_eq!(
        config.watermark.source,
        Some(WatermarkSource::Image {
            path: "logo.png".into(),
            scale: Some(0.3),
        })
    );
}

#[test]
fn test_image_scale_without_image_source_is_ignored() {
    let mut config = Config::default();
    config.watermark.source = Some(WatermarkSource::text("x"));
    config.apply(Overrides {
        image_scale: Some(2.0),
        ..Default::default()
    });
    assert_eq!(config.watermark.source, Some(WatermarkSource::text("x")));
}

#[test]
fn test_in_place_with_format_conversion_is_rejected_at_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.apply(Overrides {
        source: Some(WatermarkSource::text("x")),
        in_place: Some(true),
        format: Some("webp".into()),
        ..Default::default()
    });

    let processor = config.resolve(dir.path()).unwrap().into_processor().unwrap();
    let err = processor.run(dir.path()).unwrap_err();
    assert!(err.is_fatal());
}
