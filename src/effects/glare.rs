use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::settings::GlareSettings;
use crate::foundation::core::Rgb8;
use crate::render::frame::RenderFrame;

/// White radial flash centred on each sounding key at the keyboard line.
///
/// Strength is `intensity * (1 - dist / radius)` scaled by a per-frame factor in
/// `1 +/- jitter`, seeded from the frame and key so re-rendering a frame is stable.
pub fn draw_glare(
    frame: &mut RenderFrame,
    centers: impl IntoIterator<Item = (u8, f64)>,
    middle_y: f64,
    settings: &GlareSettings,
    frame_index: u64,
) {
    let r = settings.radius;
    if !(r > 0.0) || settings.intensity <= 0.0 {
        return;
    }
    for (key, cx) in centers {
        let mut rng = StdRng::seed_from_u64(frame_index.rotate_left(8) ^ u64::from(key));
        let jitter = if settings.jitter > 0.0 {
            1.0 + rng.random_range(-settings.jitter..=settings.jitter)
        } else {
            1.0
        };
        let strength = settings.intensity * jitter;

        let x0 = (cx - r).floor() as i64;
        let x1 = (cx + r).ceil() as i64;
        let y0 = (middle_y - r).floor() as i64;
        let y1 = (middle_y + r).ceil() as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                let dist = (x as f64 - cx).hypot(y as f64 - middle_y);
                if dist >= r {
                    continue;
                }
                let fac = strength * (1.0 - dist / r);
                frame.mix(x, y, Rgb8::white(), fac as f32);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/glare.rs"]
mod tests;
