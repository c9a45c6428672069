use super::*;
use crate::foundation::core::Canvas;

fn settings(jitter: f64) -> GlareSettings {
    GlareSettings {
        enabled: true,
        intensity: 1.0,
        radius: 10.0,
        jitter,
    }
}

#[test]
fn radial_falloff_from_center() {
    let mut f = RenderFrame::new(Canvas {
        width: 40,
        height: 40,
    });
    draw_glare(&mut f, [(0u8, 20.0)], 20.0, &settings(0.0), 0);
    assert_eq!(f.get(20, 20), Some([255; 3]));
    assert_eq!(f.get(25, 20), Some([128; 3]));
    assert_eq!(f.get(30, 20), Some([0; 3]));
    assert_eq!(f.get(0, 0), Some([0; 3]));
}

#[test]
fn jitter_is_stable_per_frame() {
    let draw = |frame_index| {
        let mut f = RenderFrame::new(Canvas {
            width: 40,
            height: 40,
        });
        draw_glare(&mut f, [(7u8, 20.0)], 20.0, &settings(0.3), frame_index);
        f
    };
    assert_eq!(draw(5), draw(5));
}
