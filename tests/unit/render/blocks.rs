use super::*;
use crate::foundation::core::{Canvas, Rgb8};

fn geometry() -> KeyGeometry {
    // 10 px white keys on integer edges.
    KeyGeometry::compute(520.0, 0.0, 0.0, 0.5).unwrap()
}

fn layout() -> BlockLayout {
    BlockLayout {
        middle_y: 100.0,
        px_per_frame: 2.0,
        x_offset: 0.0,
        min_height: 0.0,
    }
}

fn plain_style() -> BlocksSettings {
    BlocksSettings {
        color: Rgba8([200, 0, 0, 255]),
        rounding: 0.0,
        border: 0.0,
        glow: false,
        ..BlocksSettings::default()
    }
}

fn note(key: u8, start: f64, end: f64) -> Note {
    Note {
        key,
        start_frame: start,
        end_frame: end,
        velocity: 100,
    }
}

fn frame() -> RenderFrame {
    RenderFrame::new(Canvas {
        width: 520,
        height: 200,
    })
}

#[test]
fn default_layout_scrolls_speed_times_height_per_second() {
    let l = BlockLayout::from_settings(&Settings::default());
    assert!((l.px_per_frame - 7.2).abs() < 1e-9);
    assert_eq!(l.middle_y, 540.0);

    // One second note: halfway through it the top has covered half the distance.
    let n = note(40, 0.0, 30.0);
    let (top0, bottom0) = l.span(&n, 0.0);
    let (top15, _) = l.span(&n, 15.0);
    assert!((top0 - 324.0).abs() < 1e-9);
    assert_eq!(bottom0, 540.0);
    assert!((top15 - 432.0).abs() < 1e-9);
    assert!((top15 - (top0 + bottom0) / 2.0).abs() < 1e-9);
}

#[test]
fn block_rect_clips_to_keyboard_line_and_hides_offscreen() {
    let g = geometry();
    let l = layout();
    let key = g.key(39);
    let r = l.block_rect(&note(39, 0.0, 20.0), 10.0, &g).unwrap();
    assert_eq!(r, Rect::new(key.x, 80.0, key.x + 10.0, 100.0));

    // Not yet on screen.
    assert!(l.block_rect(&note(39, 100.0, 120.0), 0.0, &g).is_none());
    // Fully below the keyboard line.
    assert!(l.block_rect(&note(39, 0.0, 5.0), 10.0, &g).is_none());
}

#[test]
fn min_height_extends_short_blocks_upward() {
    let l = BlockLayout {
        min_height: 10.0,
        ..layout()
    };
    let (top, bottom) = l.span(&note(0, 10.0, 11.0), 0.0);
    assert_eq!(bottom, 80.0);
    assert_eq!(top, 70.0);
}

#[test]
fn draws_filled_block() {
    let g = geometry();
    let mut f = frame();
    let drawn = draw_blocks(&mut f, &[note(39, 0.0, 20.0)], 10.0, &g, &layout(), &plain_style());
    assert_eq!(drawn, 1);
    let x = g.key(39).x as i64;
    assert_eq!(f.get(x + 5, 90), Some([200, 0, 0]));
    assert_eq!(f.get(x + 5, 79), Some([0, 0, 0]));
    assert_eq!(f.get(x + 5, 100), Some([0, 0, 0]));
}

#[test]
fn glow_and_rounding() {
    let g = geometry();
    let style = BlocksSettings {
        rounding: 4.0,
        glow: true,
        glow_color: Rgba8([0, 0, 255, 255]),
        ..plain_style()
    };
    let mut f = frame();
    draw_blocks(&mut f, &[note(39, 0.0, 20.0)], 10.0, &g, &layout(), &style);
    let x = g.key(39).x as i64;
    // Halo above the block.
    assert_eq!(f.get(x + 5, 79), Some([0, 0, 255]));
    // Rounded corner keeps the halo color.
    assert_eq!(f.get(x, 80), Some([0, 0, 255]));
    assert_eq!(f.get(x + 5, 85), Some([200, 0, 0]));
}

#[test]
fn border_rings_the_block() {
    let g = geometry();
    let style = BlocksSettings {
        border: 1.0,
        border_color: Rgba8([255, 255, 255, 255]),
        ..plain_style()
    };
    let mut f = frame();
    draw_blocks(&mut f, &[note(39, 0.0, 20.0)], 10.0, &g, &layout(), &style);
    let x = g.key(39).x as i64;
    assert_eq!(f.get(x, 90), Some([255, 255, 255]));
    assert_eq!(f.get(x + 9, 90), Some([255, 255, 255]));
    assert_eq!(f.get(x + 5, 80), Some([255, 255, 255]));
    assert_eq!(f.get(x + 5, 90), Some([200, 0, 0]));
}

#[test]
fn octave_lines_only_above_keyboard() {
    let g = geometry();
    let mut f = frame();
    draw_octave_lines(&mut f, &g, 0.0, 100.0);
    let c1 = g.key(3).x as i64;
    assert_eq!(c1, 20);
    assert_eq!(f.get(c1, 0), Some([55, 55, 55]));
    assert_eq!(f.get(c1, 99), Some([55, 55, 55]));
    assert_eq!(f.get(c1, 100), Some([0, 0, 0]));
    assert_eq!(f.get(c1 + 1, 50), Some([0, 0, 0]));

    // Brighter pixels are kept.
    let mut f = frame();
    f.set(c1, 10, [90, 10, 200]);
    draw_octave_lines(&mut f, &g, 0.0, 100.0);
    assert_eq!(f.get(c1, 10), Some([90, 55, 200]));
}

#[test]
fn dim_top_ramps_to_full_brightness() {
    let mut f = RenderFrame::new(Canvas {
        width: 2,
        height: 300,
    });
    f.fill_rows(0, 300, Rgb8::white());
    dim_top(&mut f);
    assert_eq!(f.get(0, 0), Some([166; 3]));
    assert_eq!(f.get(0, 125), Some([210; 3]));
    assert_eq!(f.get(0, 260), Some([255; 3]));
}

#[test]
fn long_blocks_are_clipped_just_above_the_frame() {
    let g = geometry();
    let key = g.key(39);
    let r = Rect::new(key.x, -1.0e9, key.x + 10.0, 100.0);
    let c = clip_above(r, 11.0);
    assert_eq!(c, Rect::new(key.x, -11.0, key.x + 10.0, 100.0));
    assert_eq!(clip_above(Rect::new(0.0, 5.0, 10.0, 20.0), 11.0).y0, 5.0);

    let style = BlocksSettings {
        rounding: 8.0,
        glow: true,
        glow_color: Rgba8([0, 0, 255, 255]),
        border: 1.0,
        border_color: Rgba8([255, 255, 255, 255]),
        ..plain_style()
    };
    // Tops at row -80 and far beyond: the visible pixels are the same.
    let mut near = frame();
    draw_blocks(&mut near, &[note(39, 0.0, 100.0)], 10.0, &g, &layout(), &style);
    let mut far = frame();
    draw_blocks(&mut far, &[note(39, 0.0, 1.0e9)], 10.0, &g, &layout(), &style);
    assert_eq!(near, far);
    let x = key.x as i64;
    assert_eq!(far.get(x + 5, 0), Some([200, 0, 0]));
    assert_eq!(far.get(x, 0), Some([255, 255, 255]));
}
