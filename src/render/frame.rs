use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::foundation::math::{add_rgb, mix_rgb, scale_u8};

/// Tightly packed RGB8 pixel buffer, row-major, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RenderFrame {
    /// Black frame.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.rgb_len()],
        }
    }

    /// Wrap an existing buffer; `data.len()` must equal `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> PianovidResult<Self> {
        let expected = Canvas { width, height }.rgb_len();
        if data.len() != expected {
            return Err(PianovidError::evaluation(format!(
                "rgb buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 3)
    }

    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        let i = self.offset(x, y)?;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Overwrite one pixel; outside coordinates are ignored.
    pub fn set(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if let Some(i) = self.offset(x, y) {
            self.data[i..i + 3].copy_from_slice(&rgb);
        }
    }

    /// Blend one pixel toward `color` by `t`.
    pub fn mix(&mut self, x: i64, y: i64, color: Rgb8, t: f32) {
        if let Some(i) = self.offset(x, y) {
            let cur = [self.data[i], self.data[i + 1], self.data[i + 2]];
            self.data[i..i + 3].copy_from_slice(&mix_rgb(cur, color.to_array(), t));
        }
    }

    /// Add `color * fac` to one pixel, saturating.
    pub fn add(&mut self, x: i64, y: i64, color: Rgb8, fac: f32) {
        if let Some(i) = self.offset(x, y) {
            let cur = [self.data[i], self.data[i + 1], self.data[i + 2]];
            let c = color.to_array().map(|v| scale_u8(v, fac));
            self.data[i..i + 3].copy_from_slice(&add_rgb(cur, c));
        }
    }

    /// Fill rows `y0..y1` (clamped) with one color.
    pub fn fill_rows(&mut self, y0: i64, y1: i64, color: Rgb8) {
        let y0 = y0.clamp(0, i64::from(self.height)) as usize;
        let y1 = y1.clamp(0, i64::from(self.height)) as usize;
        let row = self.width as usize * 3;
        let rgb = color.to_array();
        for px in self.data[y0 * row..y1.max(y0) * row].chunks_exact_mut(3) {
            px.copy_from_slice(&rgb);
        }
    }

    /// Multiply every channel of row `y` by `fac`.
    pub fn scale_row(&mut self, y: u32, fac: f32) {
        if y >= self.height {
            return;
        }
        let row = self.width as usize * 3;
        let start = y as usize * row;
        for v in &mut self.data[start..start + row] {
            *v = scale_u8(*v, fac);
        }
    }

    /// Multiply the whole frame by `fac`.
    pub fn scale(&mut self, fac: f32) {
        for v in &mut self.data {
            *v = scale_u8(*v, fac);
        }
    }

    /// Copy `src` with its top-left corner at `(x, y)`, clipping to this frame.
    pub fn blit(&mut self, src: &RenderFrame, x: i64, y: i64) {
        let dst_w = i64::from(self.width);
        let x0 = x.max(0);
        let x1 = (x + i64::from(src.width)).min(dst_w);
        if x0 >= x1 {
            return;
        }
        let n = (x1 - x0) as usize * 3;
        for sy in 0..i64::from(src.height) {
            let dy = y + sy;
            let (Some(d), Some(s)) = (self.offset(x0, dy), src.offset(x0 - x, sy)) else {
                continue;
            };
            self.data[d..d + n].copy_from_slice(&src.data[s..s + n]);
        }
    }

    /// Convert for PNG output.
    pub fn to_image(&self) -> PianovidResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| PianovidError::evaluation("frame buffer does not match its size"))
    }

    pub fn from_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
