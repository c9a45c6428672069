use super::*;
use crate::foundation::core::Canvas;

#[test]
fn radius_zero_is_identity() {
    let f = RenderFrame::from_rgb(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(blur_frame(&f, 0).unwrap(), f);
}

#[test]
fn constant_image_is_unchanged() {
    let f = RenderFrame::from_rgb(4, 3, [10u8, 20, 30].repeat(12)).unwrap();
    assert_eq!(blur_frame(&f, 3).unwrap(), f);
}

#[test]
fn spreads_energy_from_single_pixel() {
    let mut f = RenderFrame::new(Canvas {
        width: 5,
        height: 5,
    });
    f.set(2, 2, [255, 255, 255]);
    let out = blur_frame(&f, 2).unwrap();

    let lit = out.data().chunks_exact(3).filter(|px| px[0] != 0).count();
    assert!(lit > 1);
    let sum: i32 = out.data().chunks_exact(3).map(|px| i32::from(px[0])).sum();
    assert!((sum - 255).abs() <= 15);
    assert!(out.get(2, 2).unwrap()[0] < 255);
}

#[test]
fn fade_radius_ramps_to_zero() {
    assert_eq!(fade_blur_radius(0.0), 8);
    assert_eq!(fade_blur_radius(0.5), 4);
    assert_eq!(fade_blur_radius(1.0), 0);
    assert_eq!(fade_blur_radius(2.0), 0);
}
