//! Falling note blocks, octave guide lines, and top dimming.

use kurbo::Shape;

use crate::config::settings::{BlocksSettings, Settings};
use crate::foundation::core::{Point, Rect, Rgba8, RoundedRect};
use crate::piano::KeyGeometry;
use crate::render::frame::RenderFrame;
use crate::timeline::Note;

const GLOW_SPREAD: f64 = 2.0;
const OCTAVE_LINE_FLOOR: u8 = 55;
const DIM_ROWS: u32 = 250;
const DIM_MIN: f32 = 0.65;

/// Vertical mapping from note time to screen rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockLayout {
    /// Keyboard line; blocks touch it when their note starts.
    pub middle_y: f64,
    /// Scroll speed in pixels per frame.
    pub px_per_frame: f64,
    pub x_offset: f64,
    pub min_height: f64,
}

impl BlockLayout {
    /// `px_per_frame = speed * height / fps`.
    pub fn from_settings(settings: &Settings) -> Self {
        let out = &settings.output;
        Self {
            middle_y: out.middle_y(),
            px_per_frame: settings.blocks.speed * f64::from(out.height) / out.fps.as_f64(),
            x_offset: settings.blocks.x_offset,
            min_height: settings.blocks.min_height,
        }
    }

    /// `(top, bottom)` of a note's block at `note_frame`, before clipping.
    pub fn span(&self, note: &Note, note_frame: f64) -> (f64, f64) {
        let top = self.middle_y - (note.end_frame - note_frame) * self.px_per_frame;
        let bottom = self.middle_y - (note.start_frame - note_frame) * self.px_per_frame;
        if bottom - top < self.min_height {
            (bottom - self.min_height, bottom)
        } else {
            (top, bottom)
        }
    }

    /// On-screen block rectangle, clipped to the keyboard line; `None` when not visible.
    pub fn block_rect(&self, note: &Note, note_frame: f64, geometry: &KeyGeometry) -> Option<Rect> {
        let (top, bottom) = self.span(note, note_frame);
        if bottom < 0.0 || top >= self.middle_y {
            return None;
        }
        let key = geometry.key(usize::from(note.key));
        let x = key.x + self.x_offset;
        Some(Rect::new(x, top, x + key.width, bottom.min(self.middle_y)))
    }
}

fn fill_shape(frame: &mut RenderFrame, shape: &RoundedRect, color: Rgba8, strength: f32) {
    let bbox = shape.bounding_box();
    let t = color.alpha() * strength;
    if t <= 0.0 {
        return;
    }
    for y in bbox.y0.floor() as i64..bbox.y1.ceil() as i64 {
        for x in bbox.x0.floor() as i64..bbox.x1.ceil() as i64 {
            if shape.contains(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                frame.mix(x, y, color.rgb(), t);
            }
        }
    }
}

fn stroke_shape(frame: &mut RenderFrame, rect: Rect, radius: f64, border: f64, color: Rgba8) {
    let outer = RoundedRect::from_rect(rect, radius);
    // Ring of whole pixels; thin borders are drawn fainter.
    let ring = border.ceil();
    let inner_rect = rect.inset(-ring);
    let inner = (inner_rect.width() > 0.0 && inner_rect.height() > 0.0)
        .then(|| RoundedRect::from_rect(inner_rect, (radius - ring).max(0.0)));
    let t = color.alpha() * (border / ring) as f32;

    let bbox = outer.bounding_box();
    for y in bbox.y0.floor() as i64..bbox.y1.ceil() as i64 {
        for x in bbox.x0.floor() as i64..bbox.x1.ceil() as i64 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if outer.contains(p) && !inner.is_some_and(|i| i.contains(p)) {
                frame.mix(x, y, color.rgb(), t);
            }
        }
    }
}

/// Drop the part of `rect` more than `margin` above row 0.
pub fn clip_above(rect: Rect, margin: f64) -> Rect {
    let top = rect.y0.max(-margin);
    Rect::new(rect.x0, top, rect.x1, rect.y1.max(top))
}

/// One block: optional halo, rounded fill, optional border.
pub fn draw_block(frame: &mut RenderFrame, rect: Rect, style: &BlocksSettings) {
    let rect = clip_above(rect, style.rounding.max(0.0) + GLOW_SPREAD + style.border.ceil());
    let radius = style.rounding.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    if style.glow {
        let halo = rect.inflate(GLOW_SPREAD, GLOW_SPREAD);
        fill_shape(frame, &RoundedRect::from_rect(halo, radius), style.glow_color, 1.0);
    }
    fill_shape(frame, &RoundedRect::from_rect(rect, radius), style.color, 1.0);
    if style.border > 0.0 {
        stroke_shape(frame, rect, radius, style.border, style.border_color);
    }
}

/// Draw every visible block at `note_frame`. Returns the number drawn.
pub fn draw_blocks(
    frame: &mut RenderFrame,
    notes: &[Note],
    note_frame: f64,
    geometry: &KeyGeometry,
    layout: &BlockLayout,
    style: &BlocksSettings,
) -> usize {
    let mut drawn = 0;
    for note in notes {
        if let Some(rect) = layout.block_rect(note, note_frame, geometry) {
            draw_block(frame, rect, style);
            drawn += 1;
        }
    }
    drawn
}

/// Vertical line at every C above the keyboard line, lifted to a minimum brightness.
pub fn draw_octave_lines(frame: &mut RenderFrame, geometry: &KeyGeometry, x_offset: f64, middle_y: f64) {
    let bottom = middle_y.round().max(0.0) as i64;
    for x in geometry.octave_boundaries() {
        let x = (x + x_offset).round() as i64;
        for y in 0..bottom {
            if let Some(px) = frame.get(x, y) {
                frame.set(x, y, px.map(|v| v.max(OCTAVE_LINE_FLOOR)));
            }
        }
    }
}

/// Darken the top rows, ramping from 0.65 at row 0 back to full brightness.
pub fn dim_top(frame: &mut RenderFrame) {
    for y in 0..DIM_ROWS.min(frame.height()) {
        let fac = DIM_MIN + (1.0 - DIM_MIN) * (y as f32 / DIM_ROWS as f32);
        frame.scale_row(y, fac);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blocks.rs"]
mod tests;
