use super::*;

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas {
        width: w,
        height: h,
    }
}

#[test]
fn new_frame_is_black_and_sized() {
    let f = RenderFrame::new(canvas(4, 3));
    assert_eq!(f.data().len(), 36);
    assert!(f.data().iter().all(|v| *v == 0));
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let mut f = RenderFrame::new(canvas(2, 2));
    f.set(-1, 0, [255; 3]);
    f.set(2, 0, [255; 3]);
    f.mix(0, 5, Rgb8::white(), 1.0);
    assert!(f.data().iter().all(|v| *v == 0));
    assert_eq!(f.get(2, 2), None);
}

#[test]
fn mix_and_add_blend() {
    let mut f = RenderFrame::new(canvas(2, 1));
    f.mix(0, 0, Rgb8::new(200, 100, 0), 0.5);
    assert_eq!(f.get(0, 0), Some([100, 50, 0]));
    f.add(0, 0, Rgb8::white(), 1.0);
    assert_eq!(f.get(0, 0), Some([255, 255, 255]));
}

#[test]
fn fill_rows_and_scale_row() {
    let mut f = RenderFrame::new(canvas(2, 4));
    f.fill_rows(2, 10, Rgb8::gray(100));
    assert_eq!(f.get(1, 1), Some([0, 0, 0]));
    assert_eq!(f.get(1, 3), Some([100, 100, 100]));
    f.scale_row(3, 0.5);
    assert_eq!(f.get(0, 3), Some([50, 50, 50]));
    assert_eq!(f.get(0, 2), Some([100, 100, 100]));
}

#[test]
fn blit_clips_to_destination() {
    let mut dst = RenderFrame::new(canvas(3, 3));
    let src = RenderFrame::from_rgb(2, 2, vec![9; 12]).unwrap();
    dst.blit(&src, 2, -1);
    assert_eq!(dst.get(2, 0), Some([9, 9, 9]));
    assert_eq!(dst.get(1, 0), Some([0, 0, 0]));
    assert_eq!(dst.get(2, 1), Some([0, 0, 0]));
}

#[test]
fn from_rgb_checks_length() {
    assert!(RenderFrame::from_rgb(2, 2, vec![0; 11]).is_err());
}

#[test]
fn image_conversion_preserves_pixels() {
    let mut f = RenderFrame::new(canvas(2, 2));
    f.set(1, 1, [1, 2, 3]);
    let img = f.to_image().unwrap();
    assert_eq!(img.get_pixel(1, 1).0, [1, 2, 3]);
    assert_eq!(RenderFrame::from_image(img), f);
}
