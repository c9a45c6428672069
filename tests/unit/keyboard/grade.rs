use super::*;

#[test]
fn identity_keeps_pixels() {
    let src = RenderFrame::from_rgb(2, 2, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120])
        .unwrap();
    assert_eq!(KeyboardGrade::identity().apply(&src), src);
}

#[test]
fn dims_then_tints() {
    let src = RenderFrame::from_rgb(1, 1, vec![110, 5, 210]).unwrap();
    let g = KeyboardGrade {
        height_fac: 1.0,
        sub_dim: 10.0,
        mult_dim: 0.5,
        rgb_mod: [1.0, 1.0, 2.0],
    };
    assert_eq!(g.apply(&src).data(), &[50, 0, 200]);
}

#[test]
fn height_factor_stretches_rows() {
    let src = RenderFrame::from_rgb(1, 2, vec![0, 0, 0, 255, 255, 255]).unwrap();
    let g = KeyboardGrade {
        height_fac: 2.0,
        ..KeyboardGrade::identity()
    };
    let out = g.apply(&src);
    assert_eq!(out.height(), 4);
    assert_eq!(out.get(0, 1), Some([0; 3]));
    assert_eq!(out.get(0, 2), Some([255; 3]));
}
