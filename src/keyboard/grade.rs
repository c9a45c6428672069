use crate::config::settings::KeyboardSettings;
use crate::foundation::core::Canvas;
use crate::render::frame::RenderFrame;

/// Color and height adjustments applied to the cropped keyboard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyboardGrade {
    /// Vertical stretch.
    pub height_fac: f64,
    /// Subtracted from every channel, floored at 0.
    pub sub_dim: f64,
    /// Multiplies every channel.
    pub mult_dim: f64,
    /// Per-channel multipliers.
    pub rgb_mod: [f64; 3],
}

impl KeyboardGrade {
    pub fn from_settings(kb: &KeyboardSettings) -> Self {
        Self {
            height_fac: kb.height_fac,
            sub_dim: kb.sub_dim,
            mult_dim: kb.mult_dim,
            rgb_mod: kb.rgb_mod,
        }
    }

    /// Grade that leaves the image unchanged.
    pub fn identity() -> Self {
        Self {
            height_fac: 1.0,
            sub_dim: 0.0,
            mult_dim: 1.0,
            rgb_mod: [1.0; 3],
        }
    }

    /// Output height for a strip `height` rows tall.
    pub fn scaled_height(&self, height: u32) -> u32 {
        (f64::from(height) * self.height_fac).round().max(1.0) as u32
    }

    pub fn apply(&self, src: &RenderFrame) -> RenderFrame {
        let out_h = self.scaled_height(src.height());
        let mut out = RenderFrame::new(Canvas {
            width: src.width(),
            height: out_h,
        });
        let fac = self.rgb_mod.map(|m| m * self.mult_dim);
        let row_len = src.width() as usize * 3;
        let scale = f64::from(src.height()) / f64::from(out_h);

        for y in 0..out_h {
            // Nearest source row.
            let sy = ((f64::from(y) + 0.5) * scale).floor() as usize;
            let sy = sy.min(src.height() as usize - 1);
            let s = &src.data()[sy * row_len..(sy + 1) * row_len];
            let start = y as usize * row_len;
            let d = &mut out.data_mut()[start..start + row_len];
            for (i, (dv, sv)) in d.iter_mut().zip(s).enumerate() {
                let v = (f64::from(*sv) - self.sub_dim).max(0.0) * fac[i % 3];
                *dv = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/grade.rs"]
mod tests;
