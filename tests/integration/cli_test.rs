// End-to-end runs of the watermill binary

use super::test_harness::{binary, files_under, Fixture};
use std::process::Command;

fn watermill() -> Command {
    let mut cmd = Command::new(binary());
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_run_prints_json_report_and_exits_zero() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 50, 40);
    fixture.add_raw("broken.png", b"not a png");

    let output = watermill()
        .arg(fixture.input())
        .args(["--text", "hello", "--report", "json", "--output-dir"])
        .arg(fixture.out())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["processed"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["failures"][0]["kind"], "decode");
    assert_eq!(files_under(&fixture.out()), vec![fixture.out().join("a.png")]);
}

#[test]
fn test_default_output_dir_next_to_inputs() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 50, 40);

    let status = watermill()
        .arg(fixture.input())
        .args(["--text", "x"])
        .status()
        .unwrap();

    assert!(status.success());
    assert!(fixture.input().join("input_watermark").join("a.png").exists());
}

#[test]
fn test_prefix_writes_next_to_sources() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 50, 40);

    let status = watermill()
        .arg(fixture.input())
        .args(["--text", "x", "--prefix", "wm_"])
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(
        files_under(&fixture.input()),
        vec![fixture.input().join("a.png"), fixture.input().join("wm_a.png")]
    );
}

#[test]
fn test_missing_root_exits_with_fatal_code() {
    let fixture = Fixture::new();

    let output = watermill()
        .arg(fixture.path().join("missing"))
        .args(["--text", "x"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_no_watermark_source_exits_with_fatal_code() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 10, 10);

    let output = watermill().arg(fixture.input()).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No watermark source"));
}

#[test]
fn test_invalid_color_exits_with_fatal_code() {
    let fixture = Fixture::new();

    let output = watermill()
        .arg(fixture.input())
        .args(["--text", "x", "--color", "#12"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_file_with_cli_override() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 40, 40);
    fixture.add_gradient("b.png", 40, 40);

    let config = fixture.path().join("watermill.yaml");
    std::fs::write(
        &config,
        r#"
watermark:
  source:
    type: text
    text: "from config"
  position: tiled
output:
  suffix: "_cfg"
"#,
    )
    .unwrap();

    let status = watermill()
        .arg(fixture.input())
        .arg("--config")
        .arg(&config)
        .args(["--suffix", "_cli", "--jobs", "2"])
        .status()
        .unwrap();

    assert!(status.success());
    assert!(fixture.input().join("a_cli.png").exists());
    assert!(fixture.input().join("b_cli.png").exists());
    assert!(!fixture.input().join("a_cfg.png").exists());
}

#[test]
fn test_text_report_on_stdout_only() {
    let fixture = Fixture::new();
    fixture.add_gradient("a.png", 30, 30);

    let output = watermill()
        .arg(fixture.input())
        .args(["--text", "x", "-o"])
        .arg(fixture.out())
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Processed: 1"));
    assert!(!stdout.contains("INFO"));
}
