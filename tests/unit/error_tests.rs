// Error classification tests

use watermill::error::{ErrorKind, WatermarkError};

#[test]
fn test_error_kinds_cover_every_variant() {
    // Scenario 1: configuration problems are fatal
    let config_error = WatermarkError::config("input directory does not exist");
    assert_eq!(config_error.kind(), ErrorKind::Configuration);
    assert!(config_error.is_fatal());

    // Scenario 2: per-file problems are recorded, never fatal
    for err in [
        WatermarkError::decode("truncated"),
        WatermarkError::UnsupportedFormat("a.png contains JPEG data".into()),
        WatermarkError::render("empty text"),
        WatermarkError::write("disk full"),
    ] {
        assert!(!err.is_fatal(), "{} should not be fatal", err);
    }

    // Scenario 3: a format mismatch is reported as a decode failure
    assert_eq!(
        WatermarkError::UnsupportedFormat("x".into()).kind(),
        ErrorKind::Decode
    );
}

#[test]
fn test_error_kind_display_matches_report_names() {
    assert_eq!(ErrorKind::Configuration.to_string(), "configuration");
    assert_eq!(ErrorKind::Decode.to_string(), "decode");
    assert_eq!(ErrorKind::Render.to_string(), "render");
    assert_eq!(ErrorKind::Write.to_string(), "write");
}

#[test]
fn test_errors_work_with_anyhow_context() {
    use anyhow::Context;

    let result: Result<(), WatermarkError> = Err(WatermarkError::config("bad margin"));
    let err = result.context("Invalid watermark settings").unwrap_err();

    assert_eq!(
        format!("{:#}", err),
        "Invalid watermark settings: Configuration error: bad margin"
    );
    assert!(err.downcast_ref::<WatermarkError>().is_some());
}
