use std::path::Path;

use anyhow::Context;
use kurbo::{Circle, Line, ParamCurve, ParamCurveArclen, Shape};

use crate::foundation::core::{Point, Rgb8};
use crate::foundation::error::PianovidResult;
use crate::keyboard::crop::ProjectiveCrop;
use crate::render::frame::RenderFrame;

const RED: Rgb8 = Rgb8::new(255, 0, 0);
const GREEN: Rgb8 = Rgb8::new(0, 255, 0);
const MARKER_RADIUS: f64 = 10.0;

fn stroke_line(frame: &mut RenderFrame, a: Point, b: Point, color: Rgb8) {
    let line = Line::new(a, b);
    let steps = line.arclen(0.5).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let p = line.eval(f64::from(i) / f64::from(steps));
        let (x, y) = (p.x.round() as i64, p.y.round() as i64);
        // 2 px wide.
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            frame.set(x + dx, y + dy, color.to_array());
        }
    }
}

fn stroke_circle(frame: &mut RenderFrame, center: Point, color: Rgb8) {
    let circle = Circle::new(center, MARKER_RADIUS);
    let mut prev: Option<Point> = None;
    circle.path_elements(0.25).for_each(|el| {
        if let Some(p) = el.end_point() {
            if let Some(q) = prev {
                stroke_line(frame, q, p, color);
            }
            prev = Some(p);
        }
    });
}

/// Source frame with the calibration quad in red and the mask extension in green.
pub fn draw_calibration(src: &RenderFrame, crop: &ProjectiveCrop) -> RenderFrame {
    let mut out = src.clone();
    let [p1, p2, p3, p4] = crop.quad().points;
    let [p5, p6] = crop.extension();

    for (a, b) in [(p1, p2), (p2, p3), (p3, p4), (p4, p1)] {
        stroke_line(&mut out, a, b, RED);
    }
    for (a, b) in [(p3, p6), (p4, p5), (p5, p6)] {
        stroke_line(&mut out, a, b, GREEN);
    }
    for p in [p1, p2, p3, p4] {
        stroke_circle(&mut out, p, RED);
    }
    for p in [p5, p6] {
        stroke_circle(&mut out, p, GREEN);
    }
    out
}

/// Write a frame as PNG, creating parent directories.
pub fn save_png(frame: &RenderFrame, path: &Path) -> PianovidResult<()> {
    crate::encode::ensure_parent_dir(path)?;
    frame
        .to_image()?
        .save(path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/preview.rs"]
mod tests;
