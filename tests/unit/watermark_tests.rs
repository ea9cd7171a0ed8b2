// Watermark geometry, colour and template tests through the public API

use chrono::{Local, NaiveDate, TimeZone};
use image::{Rgba, RgbaImage};
use rstest::rstest;
use watermill::watermark::font::embedded_font;
use watermill::watermark::{
    blend_pixels, calculate_position, calculate_tiled_positions, measure_text, parse_color,
    render_text, resolve_template, rotate_image, rotated_bounds, Color, ImageDimensions,
    PlacementPosition, TemplateContext, TextRenderOptions, WatermarkDimensions, WatermarkPosition,
    WatermarkSpec,
};

const IMAGE: ImageDimensions = ImageDimensions {
    width: 800,
    height: 600,
};

const MARK: WatermarkDimensions = WatermarkDimensions {
    width: 100,
    height: 40,
};

#[rstest]
#[case(WatermarkPosition::TopLeft, 10, 10)]
#[case(WatermarkPosition::TopCenter, 350, 10)]
#[case(WatermarkPosition::TopRight, 690, 10)]
#[case(WatermarkPosition::CenterLeft, 10, 280)]
#[case(WatermarkPosition::Center, 350, 280)]
#[case(WatermarkPosition::CenterRight, 690, 280)]
#[case(WatermarkPosition::BottomLeft, 10, 550)]
#[case(WatermarkPosition::BottomCenter, 350, 550)]
#[case(WatermarkPosition::BottomRight, 690, 550)]
fn test_nine_grid_positions(#[case] position: WatermarkPosition, #[case] x: i32, #[case] y: i32) {
    assert_eq!(
        calculate_position(position, &IMAGE, &MARK, 10),
        PlacementPosition::new(x, y)
    );
}

#[test]
fn test_tiles_cover_whole_canvas() {
    let positions = calculate_tiled_positions(&IMAGE, &MARK, 20);

    // Stride 120 x 60: 7 columns, 10 rows
    assert_eq!(positions.len(), 70);
    assert_eq!(positions[0], PlacementPosition::new(0, 0));
    assert!(positions.contains(&PlacementPosition::new(720, 540)));
    assert!(positions.iter().all(|p| p.x < 800 && p.y < 600));
}

#[rstest]
#[case(100, 40, 0.0, (100, 40))]
#[case(100, 40, 90.0, (40, 100))]
#[case(100, 40, -90.0, (40, 100))]
#[case(100, 40, 180.0, (100, 40))]
#[case(100, 100, 45.0, (142, 142))]
fn test_rotated_bounds(
    #[case] w: u32,
    #[case] h: u32,
    #[case] degrees: f32,
    #[case] expected: (u32, u32),
) {
    assert_eq!(rotated_bounds(w, h, degrees), expected);
}

#[test]
fn test_rotate_image_uses_rotated_bounds() {
    let raster = RgbaImage::from_pixel(30, 10, Rgba([255, 255, 255, 255]));
    for degrees in [0.0, 30.0, 90.0, 135.0, -45.0] {
        let rotated = rotate_image(&raster, degrees);
        assert_eq!(rotated.dimensions(), rotated_bounds(30, 10, degrees));
    }
}

#[rstest]
#[case("white", Color::new(255, 255, 255))]
#[case("Orange", Color::new(255, 165, 0))]
#[case("grey", Color::new(128, 128, 128))]
#[case("#0f0", Color::new(0, 255, 0))]
#[case("#336699", Color::new(0x33, 0x66, 0x99))]
#[case("#33669980", Color::rgba(0x33, 0x66, 0x99, 0x80))]
#[case("10, 20, 30", Color::new(10, 20, 30))]
#[case("10,20,30,40", Color::rgba(10, 20, 30, 40))]
fn test_parse_color(#[case] input: &str, #[case] expected: Color) {
    assert_eq!(parse_color(input).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("chartreuse-ish")]
#[case("#12")]
#[case("#GGHHII")]
#[case("256,0,0")]
#[case("1,2")]
fn test_parse_color_rejects(#[case] input: &str) {
    assert!(parse_color(input).unwrap_err().is_fatal());
}

#[test]
fn test_blend_boundaries() {
    let bg = Rgba([10, 20, 30, 255]);
    let fg = Rgba([200, 100, 50, 255]);

    assert_eq!(blend_pixels(bg, fg, 0.0), bg);
    assert_eq!(blend_pixels(bg, fg, 1.0), fg);
    assert_eq!(blend_pixels(bg, Rgba([200, 100, 50, 0]), 1.0), bg);
}

#[test]
fn test_multiline_text_is_taller() {
    let font = embedded_font().unwrap();
    let (w1, h1) = measure_text(&font, "line", 24.0);
    let (w2, h2) = measure_text(&font, "line\nline", 24.0);

    assert_eq!(w1, w2);
    assert!(h2 > h1 + h1 / 2);
}

#[test]
fn test_render_text_matches_measurement() {
    let font = embedded_font().unwrap();
    let options = TextRenderOptions {
        text: "Hello".to_string(),
        font_size: 32.0,
        color: Color::new(255, 0, 0),
    };

    let raster = render_text(&font, &options).unwrap();
    assert_eq!(raster.dimensions(), measure_text(&font, "Hello", 32.0));
    assert!(raster.pixels().any(|p| p[3] == 255 && p[0] == 255 && p[1] == 0));
}

#[test]
fn test_template_variables() {
    let mut context = TemplateContext::from_path("/photos/IMG_0042.JPG");
    context.set_dimensions(4000, 3000);
    context.set_taken(
        NaiveDate::from_ymd_opt(2023, 7, 14)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap(),
    );
    context.set_now(Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());

    assert_eq!(
        resolve_template("{{stem}}.{{ext}} {{width}}x{{height}}", &context),
        "IMG_0042.JPG 4000x3000"
    );
    assert_eq!(resolve_template("{{ filename }}", &context), "IMG_0042.JPG");
    assert_eq!(resolve_template("Taken {{taken}}", &context), "Taken 2023-07-14");
    assert_eq!(resolve_template("{{date}}", &context), "2024-01-02");
    assert_eq!(resolve_template("{{datetime}}", &context), "2024-01-02 03:04:05");
    assert_eq!(resolve_template("[{{unknown}}]", &context), "[]");
    assert_eq!(resolve_template("no variables", &context), "no variables");
}

#[test]
fn test_taken_falls_back_to_modified() {
    let mut context = TemplateContext::new();
    assert_eq!(resolve_template("{{taken}}", &context), "");

    context.set_modified(Local.with_ymd_and_hms(2022, 12, 31, 10, 0, 0).unwrap());
    assert_eq!(resolve_template("{{taken}}", &context), "2022-12-31");
    assert_eq!(resolve_template("{{modified}}", &context), "2022-12-31");
}

#[rstest]
#[case("bottom_right", WatermarkPosition::BottomRight)]
#[case("Middle Left", WatermarkPosition::CenterLeft)]
#[case("tile", WatermarkPosition::Tiled)]
fn test_position_from_str(#[case] input: &str, #[case] expected: WatermarkPosition) {
    assert_eq!(input.parse::<WatermarkPosition>().unwrap(), expected);
}

#[test]
fn test_spec_validation() {
    assert!(WatermarkSpec::text("ok").validate().is_ok());
    assert!(WatermarkSpec::text(" ").validate().is_err());
    assert!(WatermarkSpec::text("ok").with_opacity(f32::NAN).validate().is_err());
    assert!(WatermarkSpec::text("ok").with_opacity(-0.1).validate().is_err());
    assert!(WatermarkSpec::text("ok").with_font_size(0).validate().is_err());
    assert!(WatermarkSpec::text("ok")
        .with_rotation(f32::INFINITY)
        .validate()
        .is_err());
    assert!(WatermarkSpec::image("logo.png").with_scale(0.0).validate().is_err());
    assert!(WatermarkSpec::image("logo.png").with_scale(0.5).validate().is_ok());
}
