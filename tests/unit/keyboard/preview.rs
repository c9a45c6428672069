use super::*;
use crate::foundation::core::Canvas;
use crate::keyboard::crop::{CalibrationQuad, compute_crop};

#[test]
fn draws_quad_red_and_extension_green() {
    let src = RenderFrame::new(Canvas {
        width: 200,
        height: 200,
    });
    let quad = CalibrationQuad::new(
        [[40.0, 40.0], [160.0, 40.0], [160.0, 100.0], [40.0, 100.0]],
        40.0,
    );
    let crop = compute_crop(&quad, 100).unwrap();
    let out = draw_calibration(&src, &crop);

    assert_eq!(out.get(100, 40), Some([255, 0, 0]));
    assert_eq!(out.get(160, 70), Some([255, 0, 0]));
    assert_eq!(out.get(100, 140), Some([0, 255, 0]));
    assert_eq!(out.get(40, 120), Some([0, 255, 0]));
    assert_eq!(out.get(100, 70), Some([0, 0, 0]));
    // Source untouched.
    assert!(src.data().iter().all(|v| *v == 0));
}

#[test]
fn save_png_writes_file() {
    let dir = std::env::temp_dir().join(format!("pianovid_preview_{}", std::process::id()));
    let path = dir.join("nested").join("p.png");
    let f = RenderFrame::new(Canvas {
        width: 4,
        height: 2,
    });
    save_png(&f, &path).unwrap();
    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (4, 2));
    std::fs::remove_dir_all(&dir).unwrap();
}
