use crate::foundation::error::{PianovidError, PianovidResult};

pub use kurbo::{Point, Rect, RoundedRect, Vec2};

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in output space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> PianovidResult<Self> {
        if start.0 > end.0 {
            return Err(PianovidError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> PianovidResult<Self> {
        if den == 0 {
            return Err(PianovidError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(PianovidError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse an ffprobe-style rate such as `"30000/1001"` or `"25"`.
    pub fn parse(s: &str) -> PianovidResult<Self> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num = num
            .parse::<u32>()
            .map_err(|e| PianovidError::validation(format!("invalid fps numerator '{num}': {e}")))?;
        let den = den.parse::<u32>().map_err(|e| {
            PianovidError::validation(format!("invalid fps denominator '{den}': {e}"))
        })?;
        Self::new(num, den)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: f64) -> f64 {
        frames * self.frame_duration_secs()
    }

    /// Convert seconds to a (fractional) frame count.
    pub fn secs_to_frames(self, secs: f64) -> f64 {
        secs * self.as_f64()
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Number of bytes in a tightly packed RGB8 buffer of this size.
    pub fn rgb_len(self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Straight RGB8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Build a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Gray level `v` on all channels.
    pub const fn gray(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Black.
    pub const fn black() -> Self {
        Self::gray(0)
    }

    /// White.
    pub const fn white() -> Self {
        Self::gray(255)
    }

    /// Channels as an array.
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// RGBA8 color with straight (non-premultiplied) alpha, as used in settings documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    /// Color part.
    pub fn rgb(self) -> Rgb8 {
        Rgb8::new(self.0[0], self.0[1], self.0[2])
    }

    /// Alpha as a `[0, 1]` factor.
    pub fn alpha(self) -> f32 {
        f32::from(self.0[3]) / 255.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
