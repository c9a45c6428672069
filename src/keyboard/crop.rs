//! Perspective crop of the keyboard footage.
//!
//! The calibration quad is extended downward along its side edges by the mask depth. That
//! extended quad is mapped onto an axis-aligned rectangle as wide as the output; the rows that
//! came from the extension fade quadratically to black.

use crate::config::settings::KeyboardSettings;
use crate::foundation::core::Point;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

const EPS: f64 = 1e-9;

/// Keyboard corners in source pixels plus the fade depth below them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationQuad {
    /// Top-left, top-right, bottom-right, bottom-left.
    pub points: [Point; 4],
    /// Source pixels below the bottom edge to keep.
    pub mask: f64,
}

impl CalibrationQuad {
    pub fn new(points: [[f64; 2]; 4], mask: f64) -> Self {
        Self {
            points: points.map(|[x, y]| Point::new(x, y)),
            mask,
        }
    }

    pub fn from_settings(kb: &KeyboardSettings) -> Self {
        Self::new(kb.crop, kb.mask)
    }

    /// Bottom-left and bottom-right corners pushed `mask` pixels down their side edges.
    pub fn extension(&self) -> PianovidResult<[Point; 2]> {
        let [p1, p2, p3, p4] = self.points;
        Ok([
            extend(p1, p4, self.mask, "left")?,
            extend(p2, p3, self.mask, "right")?,
        ])
    }
}

fn extend(top: Point, bottom: Point, mask: f64, side: &str) -> PianovidResult<Point> {
    let dy = top.y - bottom.y;
    if dy.abs() < EPS {
        return Err(PianovidError::invalid_calibration(format!(
            "{side} edge of the keyboard quad is horizontal"
        )));
    }
    Ok(bottom + (top - bottom) * (mask / dy))
}

/// 3x3 projective transform, row-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography(pub [[f64; 3]; 3]);

impl Homography {
    /// Transform mapping each `src[i]` onto `dst[i]`.
    pub fn from_points(src: [Point; 4], dst: [Point; 4]) -> PianovidResult<Self> {
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }
        let h = solve8(a)?;
        Ok(Self([
            [h[0], h[1], h[2]],
            [h[3], h[4], h[5]],
            [h[6], h[7], 1.0],
        ]))
    }

    pub fn apply(&self, p: Point) -> Point {
        let m = &self.0;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        Point::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        )
    }

    pub fn inverse(&self) -> PianovidResult<Self> {
        let m = &self.0;
        let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        let adj = [
            [cof(1, 2, 1, 2), -cof(0, 2, 1, 2), cof(0, 1, 1, 2)],
            [-cof(1, 2, 0, 2), cof(0, 2, 0, 2), -cof(0, 1, 0, 2)],
            [cof(1, 2, 0, 1), -cof(0, 2, 0, 1), cof(0, 1, 0, 1)],
        ];
        let det = m[0][0] * adj[0][0] + m[0][1] * adj[1][0] + m[0][2] * adj[2][0];
        if !det.is_finite() || det.abs() < EPS {
            return Err(PianovidError::invalid_calibration(
                "perspective transform is singular",
            ));
        }
        Ok(Self(adj.map(|row| row.map(|v| v / det))))
    }
}

/// Gaussian elimination with partial pivoting on an augmented 8x9 system.
fn solve8(mut a: [[f64; 9]; 8]) -> PianovidResult<[f64; 8]> {
    let scale = a
        .iter()
        .flat_map(|row| row[..8].iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    let tol = EPS * scale.max(1.0);
    for col in 0..8 {
        let pivot = (col..8)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if !(a[pivot][col].abs() > tol) {
            return Err(PianovidError::invalid_calibration(
                "keyboard quad is degenerate (singular perspective transform)",
            ));
        }
        a.swap(col, pivot);
        for row in 0..8 {
            if row == col {
                continue;
            }
            let f = a[row][col] / a[col][col];
            if f == 0.0 {
                continue;
            }
            for k in col..9 {
                a[row][k] -= f * a[col][k];
            }
        }
    }
    let mut x = [0.0; 8];
    for (i, xi) in x.iter_mut().enumerate() {
        *xi = a[i][8] / a[i][i];
    }
    Ok(x)
}

/// Everything needed to warp one source frame into the keyboard strip.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectiveCrop {
    quad: CalibrationQuad,
    extension: [Point; 2],
    forward: Homography,
    inverse: Homography,
    width: u32,
    height: u32,
    mask_row: f64,
    fade: Vec<f32>,
}

impl ProjectiveCrop {
    pub fn quad(&self) -> &CalibrationQuad {
        &self.quad
    }

    /// Extended bottom-left and bottom-right points.
    pub fn extension(&self) -> [Point; 2] {
        self.extension
    }

    /// Source to destination.
    pub fn transform(&self) -> &Homography {
        &self.forward
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Destination row where the fade starts.
    pub fn mask_row(&self) -> f64 {
        self.mask_row
    }

    /// Per-row fade factors, top to bottom.
    pub fn fade(&self) -> &[f32] {
        &self.fade
    }
}

fn fade_mask(height: u32, mask_row: f64, mask: f64) -> Vec<f32> {
    let bottom = f64::from(height) - 1.0;
    let span = bottom - mask_row;
    (0..height)
        .map(|row| {
            if mask <= 0.0 || span <= 0.0 {
                return 1.0;
            }
            let v = ((bottom - f64::from(row)) / span).clamp(0.0, 1.0);
            (v * v) as f32
        })
        .collect()
}

/// Derive the warp and fade mask for an output `output_width` pixels wide.
pub fn compute_crop(quad: &CalibrationQuad, output_width: u32) -> PianovidResult<ProjectiveCrop> {
    if output_width == 0 {
        return Err(PianovidError::validation("crop output width must be > 0"));
    }
    if !(quad.mask >= 0.0) {
        return Err(PianovidError::validation("mask depth must be >= 0"));
    }
    let [p1, p2, _, p4] = quad.points;
    let [p5, p6] = quad.extension()?;

    let top = p1.distance(p2);
    if top < EPS {
        return Err(PianovidError::invalid_calibration(
            "keyboard quad has zero width",
        ));
    }
    let extended = p1.distance(p5);
    let w = f64::from(output_width);
    let h = (w * extended / top).round();
    if !(h >= 1.0) || h > f64::from(u16::MAX) {
        return Err(PianovidError::invalid_calibration(format!(
            "keyboard strip height {h} is out of range"
        )));
    }
    let mask_row = h * p1.distance(p4) / extended;

    let forward = Homography::from_points(
        [p1, p2, p6, p5],
        [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ],
    )?;
    let inverse = forward.inverse()?;
    let height = h as u32;

    Ok(ProjectiveCrop {
        quad: *quad,
        extension: [p5, p6],
        forward,
        inverse,
        width: output_width,
        height,
        mask_row,
        fade: fade_mask(height, mask_row, quad.mask),
    })
}

fn bilinear(src: &RenderFrame, x: f64, y: f64) -> [f32; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);
    let tap = |dx: i64, dy: i64| src.get(x0 + dx, y0 + dy).unwrap_or([0; 3]);
    let (a, b, c, d) = (tap(0, 0), tap(1, 0), tap(0, 1), tap(1, 1));
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        let top = f32::from(a[i]) * (1.0 - fx) + f32::from(b[i]) * fx;
        let bot = f32::from(c[i]) * (1.0 - fx) + f32::from(d[i]) * fx;
        out[i] = top * (1.0 - fy) + bot * fy;
    }
    out
}

/// Warp a source frame into the keyboard strip and apply the fade mask.
pub fn apply_crop(src: &RenderFrame, crop: &ProjectiveCrop) -> RenderFrame {
    let mut out = RenderFrame::new(crate::foundation::core::Canvas {
        width: crop.width,
        height: crop.height,
    });
    for y in 0..crop.height {
        let fade = crop.fade[y as usize];
        if fade <= 0.0 {
            continue;
        }
        for x in 0..crop.width {
            let s = crop
                .inverse
                .apply(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5));
            if !(s.x.is_finite() && s.y.is_finite()) {
                continue;
            }
            let rgb = bilinear(src, s.x - 0.5, s.y - 0.5)
                .map(|v| (v * fade).round().clamp(0.0, 255.0) as u8);
            out.set(i64::from(x), i64::from(y), rgb);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/crop.rs"]
mod tests;
