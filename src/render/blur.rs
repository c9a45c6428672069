use rayon::prelude::*;

use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

/// Separable Gaussian blur of a whole frame. `sigma` defaults to half the radius.
pub fn blur_frame(frame: &RenderFrame, radius: u32) -> PianovidResult<RenderFrame> {
    if radius == 0 || frame.width() == 0 || frame.height() == 0 {
        return Ok(frame.clone());
    }
    let sigma = (radius as f32 / 2.0).max(0.5);
    let kernel = gaussian_kernel_q16(radius, sigma)?;

    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut tmp = vec![0u8; frame.data().len()];
    let mut out = vec![0u8; frame.data().len()];
    horizontal_pass(frame.data(), &mut tmp, w, &kernel);
    vertical_pass(&tmp, &mut out, w, h, &kernel);
    RenderFrame::from_rgb(frame.width(), frame.height(), out)
}

/// Blur radius for a fade ramp value `fac` in `[0, 1]`.
pub fn fade_blur_radius(fac: f64) -> u32 {
    (8.0 * (1.0 - fac.clamp(0.0, 1.0))).round() as u32
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> PianovidResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(PianovidError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(PianovidError::evaluation("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Put the rounding residue in the centre tap so the kernel sums to exactly 1.0 (q16).
    let acc: i64 = weights.iter().map(|w| i64::from(*w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], w: usize, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let row_len = w * 3;
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(drow, srow)| {
            for x in 0..w {
                let mut acc = [0u64; 3];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x as i64 + ki as i64 - radius).clamp(0, w as i64 - 1) as usize;
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += u64::from(kw) * u64::from(srow[sx * 3 + c]);
                    }
                }
                for (c, a) in acc.iter().enumerate() {
                    drow[x * 3 + c] = q16_to_u8(*a);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let row_len = w * 3;
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, drow)| {
            for (i, d) in drow.iter_mut().enumerate() {
                let mut acc = 0u64;
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i64 + ki as i64 - radius).clamp(0, h as i64 - 1) as usize;
                    acc += u64::from(kw) * u64::from(src[sy * row_len + i]);
                }
                *d = q16_to_u8(acc);
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;
