use crate::effects::cache::{ParticleSample, ParticleSink};
use crate::foundation::core::Rgb8;
use crate::render::frame::RenderFrame;

const GLOW_EDGE: f32 = 0.6;
const GLOW_CORNER: f32 = 0.3;

/// Draws cached particles onto a frame.
pub struct ParticleDrawer<'a> {
    frame: &'a mut RenderFrame,
    color: Rgb8,
    intensity: f32,
    glow: bool,
    motion_blur: bool,
}

impl<'a> ParticleDrawer<'a> {
    pub fn new(frame: &'a mut RenderFrame, intensity: f64, glow: bool, motion_blur: bool) -> Self {
        Self {
            frame,
            color: Rgb8::white(),
            intensity: intensity as f32,
            glow,
            motion_blur,
        }
    }

    pub fn with_color(mut self, color: Rgb8) -> Self {
        self.color = color;
        self
    }

    fn point(&mut self, x: i64, y: i64, t: f32) {
        self.frame.mix(x, y, self.color, t);
        if self.glow {
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                self.frame.mix(x + dx, y + dy, self.color, t * GLOW_EDGE);
            }
            for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
                self.frame.mix(x + dx, y + dy, self.color, t * GLOW_CORNER);
            }
        }
    }
}

impl ParticleSink for ParticleDrawer<'_> {
    fn particle(&mut self, s: ParticleSample) {
        let t = s.fade * self.intensity;
        let (x, y) = (f64::from(s.x), f64::from(s.y));
        let prev = if self.motion_blur { s.prev } else { None };
        let Some((px, py)) = prev else {
            self.point(x as i64, y as i64, t);
            return;
        };

        // Trail from halfway to the previous position up to the current one.
        let (mx, my) = ((x + f64::from(px)) / 2.0, (y + f64::from(py)) / 2.0);
        let steps = (x - mx).abs().max((y - my).abs()).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let k = f64::from(i) / f64::from(steps);
            let sx = (mx + (x - mx) * k).round() as i64;
            let sy = (my + (y - my) * k).round() as i64;
            self.point(sx, sy, t);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/draw.rs"]
mod tests;
