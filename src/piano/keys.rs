use crate::config::settings::PianoSettings;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::timeline::KEY_COUNT;

/// White keys on an 88-key piano.
pub const WHITE_KEY_COUNT: usize = 52;

/// Return `true` for white keys; key 0 is A0.
pub fn is_white_key(key: usize) -> bool {
    // Shift so C = 0 in the 12-key pattern.
    !matches!((key + 9) % 12, 1 | 3 | 6 | 8 | 10)
}

/// Horizontal pixel span of one key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeySpan {
    /// Left edge in output pixels.
    pub x: f64,
    /// Width in pixels.
    pub width: f64,
}

impl KeySpan {
    pub fn center(self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn right(self) -> f64 {
        self.x + self.width
    }
}

/// Pixel spans of all 88 keys for one output width.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyGeometry {
    keys: [KeySpan; KEY_COUNT],
    white_width: f64,
    black_width: f64,
}

impl KeyGeometry {
    /// Lay out the keys across `output_width` minus the left/right margins.
    pub fn compute(
        output_width: f64,
        left_offset: f64,
        right_offset: f64,
        black_width_fac: f64,
    ) -> PianovidResult<Self> {
        let usable = output_width - left_offset - right_offset;
        if !(usable > 0.0) {
            return Err(PianovidError::validation(format!(
                "keyboard width must be > 0 (output {output_width}, offsets {left_offset}/{right_offset})"
            )));
        }
        if !(black_width_fac > 0.0) {
            return Err(PianovidError::validation("black_width_fac must be > 0"));
        }

        let white_width = usable / WHITE_KEY_COUNT as f64;
        let black_width = white_width * black_width_fac;
        let mut keys = [KeySpan { x: 0.0, width: 0.0 }; KEY_COUNT];
        let mut whites_before = 0usize;
        for (k, span) in keys.iter_mut().enumerate() {
            let edge = left_offset + whites_before as f64 * white_width;
            *span = if is_white_key(k) {
                whites_before += 1;
                KeySpan {
                    x: edge,
                    width: white_width,
                }
            } else {
                KeySpan {
                    x: edge - black_width / 2.0,
                    width: black_width,
                }
            };
        }

        Ok(Self {
            keys,
            white_width,
            black_width,
        })
    }

    /// Layout for the configured output width.
    pub fn from_settings(output_width: u32, piano: &PianoSettings) -> PianovidResult<Self> {
        Self::compute(
            f64::from(output_width),
            piano.left_offset,
            piano.right_offset,
            piano.black_width_fac,
        )
    }

    /// Span of `key`; out-of-range keys clamp to the top key.
    pub fn key(&self, key: usize) -> KeySpan {
        self.keys[key.min(KEY_COUNT - 1)]
    }

    pub fn key_center(&self, key: usize) -> f64 {
        self.key(key).center()
    }

    pub fn keys(&self) -> &[KeySpan; KEY_COUNT] {
        &self.keys
    }

    pub fn white_width(&self) -> f64 {
        self.white_width
    }

    pub fn black_width(&self) -> f64 {
        self.black_width
    }

    /// Left edges of every C key, for the octave guide lines.
    pub fn octave_boundaries(&self) -> impl Iterator<Item = f64> + '_ {
        (3..KEY_COUNT).step_by(12).map(|k| self.keys[k].x)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/piano/keys.rs"]
mod tests;
