//! Keyboard-area layers: backdrop, cropped footage, light bar.

use crate::config::settings::LightBarSettings;
use crate::foundation::core::{Fps, Rgb8};
use crate::foundation::error::PianovidResult;
use crate::keyboard::{KeyboardGrade, KeyboardSource, ProjectiveCrop, apply_crop, source_frame_index};
use crate::render::frame::RenderFrame;

const BAR_TOP_FLOOR: f32 = 0.1;
const BAR_BOTTOM_FLOOR: f32 = 0.15;
const BAR_BOTTOM_GAIN: f32 = 1.25;
const BAR_BOTTOM_ROWS: u32 = 2;

/// Solid fill from the keyboard line to the bottom of the frame.
pub fn fill_backdrop(frame: &mut RenderFrame, middle_y: f64, color: Rgb8) {
    frame.fill_rows(middle_y.round() as i64, i64::from(frame.height()), color);
}

/// Per-column light intensity: each key center adds `1 - |dx| / radius` within `radius`.
pub fn light_bar_intensity(width: u32, centers: impl IntoIterator<Item = f64>, radius: f64) -> Vec<f32> {
    let mut out = vec![0.0f32; width as usize];
    if !(radius > 0.0) {
        return out;
    }
    for cx in centers {
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(out.len());
        for (x, v) in out.iter_mut().enumerate().take(x1).skip(x0) {
            let d = (x as f64 - cx).abs();
            if d < radius {
                *v += (1.0 - d / radius) as f32;
            }
        }
    }
    out
}

/// Gray bar in the rows directly above the keyboard line.
///
/// The rows nearest the keyboard are brighter; both parts keep a minimum brightness so the bar is
/// visible with no keys held.
pub fn draw_light_bar(frame: &mut RenderFrame, intensity: &[f32], middle_y: f64, settings: &LightBarSettings) {
    let bottom = middle_y.round() as i64;
    for (x, &v) in intensity.iter().enumerate().take(frame.width() as usize) {
        let top = (v.clamp(BAR_TOP_FLOOR, 1.0) * 255.0).round() as u8;
        let low = ((v * BAR_BOTTOM_GAIN).clamp(BAR_BOTTOM_FLOOR, 1.0) * 255.0).round() as u8;
        for row in 0..settings.height {
            let y = bottom - 1 - i64::from(row);
            let level = if row < BAR_BOTTOM_ROWS { low } else { top };
            frame.set(x as i64, y, [level; 3]);
        }
    }
}

/// Cropped, graded keyboard footage placed at the keyboard line.
pub struct KeyboardLayer {
    source: Box<dyn KeyboardSource>,
    crop: ProjectiveCrop,
    grade: KeyboardGrade,
    video_start_secs: f64,
    out_fps: Fps,
}

impl KeyboardLayer {
    pub fn new(
        source: Box<dyn KeyboardSource>,
        crop: ProjectiveCrop,
        grade: KeyboardGrade,
        video_start_secs: f64,
        out_fps: Fps,
    ) -> Self {
        Self {
            source,
            crop,
            grade,
            video_start_secs,
            out_fps,
        }
    }

    pub fn crop(&self) -> &ProjectiveCrop {
        &self.crop
    }

    /// Footage frame shown at `note_frame`.
    pub fn source_index(&self, note_frame: f64) -> u64 {
        let out_fps = self.out_fps.as_f64();
        let video_fps = self.source.fps().unwrap_or(out_fps);
        source_frame_index(note_frame, out_fps, self.video_start_secs, video_fps)
    }

    /// The strip as it will be drawn at `note_frame`.
    pub fn strip(&mut self, note_frame: f64) -> PianovidResult<RenderFrame> {
        let index = self.source_index(note_frame);
        let src = self.source.frame(index)?;
        Ok(self.grade.apply(&apply_crop(src, &self.crop)))
    }

    pub fn draw(&mut self, frame: &mut RenderFrame, note_frame: f64, middle_y: f64) -> PianovidResult<()> {
        let strip = self.strip(note_frame)?;
        frame.blit(&strip, 0, middle_y.round() as i64);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/layers.rs"]
mod tests;
