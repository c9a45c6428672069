use super::*;
use crate::foundation::core::Canvas;
use crate::keyboard::{CalibrationQuad, StillImage, compute_crop};

fn frame(width: u32, height: u32) -> RenderFrame {
    RenderFrame::new(Canvas { width, height })
}

#[test]
fn backdrop_fills_lower_part() {
    let mut f = frame(4, 10);
    fill_backdrop(&mut f, 5.0, Rgb8::gray(20));
    assert_eq!(f.get(0, 4), Some([0; 3]));
    assert_eq!(f.get(3, 5), Some([20; 3]));
    assert_eq!(f.get(3, 9), Some([20; 3]));
}

#[test]
fn intensity_falls_off_linearly_and_sums() {
    let v = light_bar_intensity(400, [100.0], 160.0);
    assert_eq!(v[100], 1.0);
    assert!((v[180] - 0.5).abs() < 1e-6);
    assert!((v[20] - 0.5).abs() < 1e-6);
    assert_eq!(v[300], 0.0);

    let two = light_bar_intensity(400, [100.0, 100.0], 160.0);
    assert_eq!(two[100], 2.0);
    assert!(light_bar_intensity(10, [5.0], 0.0).iter().all(|v| *v == 0.0));
}

#[test]
fn light_bar_rows_and_floors() {
    let settings = LightBarSettings::default();
    let mut f = frame(3, 20);
    draw_light_bar(&mut f, &[0.0, 0.6, 2.0], 15.0, &settings);

    // Unlit column sits on the floors.
    assert_eq!(f.get(0, 14), Some([38; 3]));
    assert_eq!(f.get(0, 13), Some([38; 3]));
    assert_eq!(f.get(0, 12), Some([26; 3]));
    assert_eq!(f.get(0, 7), Some([26; 3]));
    assert_eq!(f.get(0, 6), Some([0; 3]));
    assert_eq!(f.get(0, 15), Some([0; 3]));

    // Bottom rows are brighter.
    assert_eq!(f.get(1, 14), Some([191; 3]));
    assert_eq!(f.get(1, 10), Some([153; 3]));
    // Saturated column.
    assert_eq!(f.get(2, 10), Some([255; 3]));
}

#[test]
fn keyboard_layer_places_strip_at_keyboard_line() {
    let mut img = frame(100, 50);
    img.fill_rows(0, 50, Rgb8::white());
    let quad = CalibrationQuad::new([[0.0, 0.0], [100.0, 0.0], [100.0, 50.0], [0.0, 50.0]], 0.0);
    let crop = compute_crop(&quad, 100).unwrap();
    let mut layer = KeyboardLayer::new(
        Box::new(StillImage::from_frame(img)),
        crop,
        KeyboardGrade::identity(),
        0.0,
        Fps { num: 30, den: 1 },
    );
    assert_eq!(layer.crop().height(), 50);
    assert_eq!(layer.source_index(30.0), 30);

    let mut f = frame(100, 120);
    layer.draw(&mut f, 0.0, 60.0).unwrap();
    assert_eq!(f.get(50, 59), Some([0; 3]));
    assert_eq!(f.get(50, 60), Some([255; 3]));
    assert_eq!(f.get(10, 109), Some([255; 3]));
    assert_eq!(f.get(50, 110), Some([0; 3]));
}
