/// Clamp into `[0, 1]`; NaN maps to 0.
pub(crate) fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Linear blend from `a` toward `b` by `t` (clamped).
pub(crate) fn mix_rgb(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = clamp01(t);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let av = f32::from(a[i]);
        let bv = f32::from(b[i]);
        out[i] = (av + (bv - av) * t).round().clamp(0.0, 255.0) as u8;
    }
    out
}

pub(crate) fn add_rgb(a: [u8; 3], b: [u8; 3]) -> [u8; 3] {
    [
        a[0].saturating_add(b[0]),
        a[1].saturating_add(b[1]),
        a[2].saturating_add(b[2]),
    ]
}

pub(crate) fn scale_u8(v: u8, fac: f32) -> u8 {
    (f32::from(v) * fac).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
