use xxhash_rust::xxh3::Xxh3;

use crate::effects::simulate::EffectParams;
use crate::piano::KeyGeometry;
use crate::timeline::Note;

const XXH3_SEED: u64 = 0x5f1d_c3a2_9b7e_4410;

/// Bump when the blob layout or the simulation changes.
pub const CACHE_FORMAT_VERSION: u32 = 2;

/// Stable hash of everything a cache's contents depend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheFingerprint {
    pub hi: u64,
    pub lo: u64,
}

impl CacheFingerprint {
    /// Lowercase hex form stored in `state.json`.
    pub fn to_hex(self) -> String {
        format!("{:016x}{:016x}", self.hi, self.lo)
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> CacheFingerprint {
        let v = self.inner.digest128();
        CacheFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

/// Fingerprint of one effect cache.
///
/// Covers every input the simulation reads: the effect and its parameters, the output
/// geometry, the key layout, the seed, and the note list.
pub fn cache_fingerprint(
    params: &EffectParams,
    geometry: &KeyGeometry,
    seed: u64,
    notes: &[Note],
) -> CacheFingerprint {
    let mut h = StableHasher::new();
    h.write_u32(CACHE_FORMAT_VERSION);
    h.write_str(params.kind.id());
    h.write_str(&format!("{:?}", params.style));
    h.write_f64(params.fps);
    h.write_f64(params.particles_per_second);
    h.write_u32(params.lifetime_frames);
    h.write_u32(params.lifetime_jitter_frames);
    h.write_f64(params.emit_jitter_frames);
    h.write_f64(params.probability);
    h.write_u32(params.width);
    h.write_u32(params.height);
    h.write_f64(params.middle_y);
    h.write_f64(params.x_offset);
    h.write_bool(params.kind.is_continuous());

    for span in geometry.keys() {
        h.write_f64(span.x);
        h.write_f64(span.width);
    }

    h.write_u64(seed);

    h.write_u64(notes.len() as u64);
    for n in notes {
        h.write_u8(n.key);
        h.write_f64(n.start_frame);
        h.write_f64(n.end_frame);
        h.write_u8(n.velocity);
    }
    h.finish()
}

/// Seed of the random stream for one note of one effect.
///
/// Independent of how notes are split across workers.
pub fn note_seed(seed: u64, effect_id: &str, note_index: u32) -> u64 {
    let mut h = Xxh3::with_seed(seed);
    h.update(effect_id.as_bytes());
    h.update(&note_index.to_le_bytes());
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/effects/fingerprint.rs"]
mod tests;
