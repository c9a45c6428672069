use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::settings::{ParticleStyle, Settings};
use crate::effects::EffectKind;
use crate::effects::fingerprint::note_seed;
use crate::effects::format::{CacheEntry, Sample, Trajectory};
use crate::foundation::core::Point;
use crate::piano::KeyGeometry;
use crate::timeline::Note;

/// Resolved parameters of one particle effect.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectParams {
    pub kind: EffectKind,
    pub style: ParticleStyle,
    pub fps: f64,
    pub particles_per_second: f64,
    /// Base lifetime in frames.
    pub lifetime_frames: u32,
    /// Lifetime variation in frames (+/-).
    pub lifetime_jitter_frames: u32,
    pub emit_jitter_frames: f64,
    pub probability: f64,
    pub width: u32,
    pub height: u32,
    /// Keyboard line, where particles are emitted.
    pub middle_y: f64,
    pub x_offset: f64,
    // Drawing only; not part of the cached data.
    pub glow: bool,
    pub motion_blur: bool,
    pub intensity: f64,
}

impl EffectParams {
    pub fn from_settings(kind: EffectKind, settings: &Settings) -> Self {
        let fx = kind.settings(&settings.effects);
        let fps = settings.output.fps.as_f64();
        Self {
            kind,
            style: fx.style.unwrap_or_else(|| kind.default_style()),
            fps,
            particles_per_second: fx.particles_per_second,
            lifetime_frames: (fx.lifetime_secs * fps).round().max(1.0) as u32,
            lifetime_jitter_frames: fx.lifetime_jitter_frames,
            emit_jitter_frames: fx.emit_jitter_frames,
            probability: fx.probability,
            width: settings.output.width,
            height: settings.output.height,
            middle_y: settings.output.middle_y(),
            x_offset: settings.blocks.x_offset,
            glow: fx.glow,
            motion_blur: fx.motion_blur,
            intensity: fx.intensity,
        }
    }

    /// Longest possible particle lifetime in frames.
    pub fn max_lifetime(&self) -> u32 {
        self.lifetime_frames + self.lifetime_jitter_frames
    }

    /// Shortest possible particle lifetime in frames.
    pub fn min_lifetime(&self) -> u32 {
        self.lifetime_frames
            .saturating_sub(self.lifetime_jitter_frames)
            .max(1)
    }
}

/// When and for how long each particle of a note lives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emission {
    /// Fractional emission frame.
    pub frame: f64,
    /// Lifetime in frames.
    pub lifetime: u32,
}

/// Random stream of one note, independent of worker assignment.
pub fn note_rng(seed: u64, kind: EffectKind, note_index: u32) -> StdRng {
    StdRng::seed_from_u64(note_seed(seed, kind.id(), note_index))
}

fn spread<R: Rng>(rng: &mut R, amount: f64) -> f64 {
    if amount > 0.0 {
        rng.random_range(-amount..=amount)
    } else {
        0.0
    }
}

fn uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if lo < hi { rng.random_range(lo..hi) } else { lo }
}

fn random_lifetime<R: Rng>(rng: &mut R, params: &EffectParams) -> u32 {
    let j = i64::from(params.lifetime_jitter_frames);
    let l = i64::from(params.lifetime_frames) + rng.random_range(-j..=j);
    l.max(1) as u32
}

/// Emission schedule of one note; empty when the note produces no particles.
///
/// Continuous emitters start a particle at the press, then every `fps / pps` frames, and end
/// with a tail particle of maximum lifetime at the release. Spacing and jitter are capped so
/// every frame from press to `release + max_lifetime` is covered by a live particle.
pub fn emission_plan<R: Rng>(rng: &mut R, note: &Note, params: &EffectParams) -> Vec<Emission> {
    let start = note.start_frame;
    let end = note.end_frame.max(start);

    if !params.kind.is_continuous() {
        if rng.random::<f64>() >= params.probability {
            return Vec::new();
        }
        return vec![Emission {
            frame: start,
            lifetime: random_lifetime(rng, params),
        }];
    }

    let min_life = f64::from(params.min_lifetime());
    let jitter = params.emit_jitter_frames.min(min_life / 4.0);
    let spacing = (params.fps / params.particles_per_second)
        .min(min_life - 2.0 * jitter)
        .max(f64::EPSILON);

    let mut plan = vec![Emission {
        frame: start,
        lifetime: random_lifetime(rng, params),
    }];
    let mut i = 1u64;
    loop {
        let nominal = start + i as f64 * spacing;
        if nominal >= end {
            break;
        }
        let frame = (nominal + spread(rng, jitter)).clamp(start, end);
        plan.push(Emission {
            frame,
            lifetime: random_lifetime(rng, params),
        });
        i += 1;
    }
    plan.push(Emission {
        frame: end,
        lifetime: params.max_lifetime(),
    });
    plan
}

#[derive(Clone, Copy, Debug)]
struct Particle {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl Particle {
    fn launch<R: Rng>(rng: &mut R, style: ParticleStyle, origin: Point) -> Self {
        let (vx, vy) = match style {
            ParticleStyle::Floating => (uniform(rng, -0.3, 0.3), -6.0),
            ParticleStyle::Bouncing => (uniform(rng, -3.0, 3.0), uniform(rng, -12.0, -8.0)),
            ParticleStyle::Sparks => (uniform(rng, -8.0, 8.0), uniform(rng, -10.0, -5.0)),
            ParticleStyle::Rising => (uniform(rng, -0.4, 0.4), uniform(rng, -3.0, -1.5)),
            ParticleStyle::Star => (uniform(rng, -2.0, 2.0), -8.0),
        };
        Self {
            x: origin.x,
            y: origin.y,
            vx,
            vy,
        }
    }

    fn step<R: Rng>(&mut self, rng: &mut R, style: ParticleStyle, floor_y: f64) {
        self.x += self.vx;
        self.y += self.vy;
        match style {
            ParticleStyle::Floating => {
                self.vx += uniform(rng, -0.25, 0.25);
                self.vy += uniform(rng, -0.04, 0.12);
            }
            ParticleStyle::Bouncing => {
                self.vx -= self.vx * 0.04;
                self.vy += 1.0;
                if self.y > floor_y {
                    self.y = 2.0 * floor_y - self.y;
                    self.vy = -self.vy * 0.6;
                }
            }
            ParticleStyle::Sparks | ParticleStyle::Star => self.vy += 0.5,
            ParticleStyle::Rising => {}
        }
    }
}

fn to_u16(v: f64, size: u32) -> u16 {
    let max = f64::from(size.saturating_sub(1).min(u32::from(u16::MAX)));
    v.round().clamp(0.0, max) as u16
}

/// Integrate one particle.
///
/// A particle emitted at `emission.frame` with lifetime `L` has one sample for every integer
/// frame in `[frame, frame + L]`. Samples before frame 0 or beyond the `u16` range are dropped.
pub fn simulate_particle<R: Rng>(
    rng: &mut R,
    style: ParticleStyle,
    origin: Point,
    emission: Emission,
    params: &EffectParams,
) -> Trajectory {
    let first = emission.frame.ceil();
    let last = (emission.frame + f64::from(emission.lifetime)).floor();
    let mut p = Particle::launch(rng, style, origin);
    let mut samples = Vec::new();

    let mut f = first;
    while f <= last {
        if (0.0..=f64::from(u16::MAX)).contains(&f) {
            samples.push(Sample {
                frame: f as u16,
                x: to_u16(p.x, params.width),
                y: to_u16(p.y, params.height),
            });
        }
        p.step(rng, style, params.middle_y);
        f += 1.0;
    }
    Trajectory { samples }
}

/// Simulate every particle of a planned note.
pub fn simulate_note<R: Rng>(
    rng: &mut R,
    note: &Note,
    plan: &[Emission],
    params: &EffectParams,
    geometry: &KeyGeometry,
) -> CacheEntry {
    let span = geometry.key(usize::from(note.key));
    let x_spread = span.width / 5.0;
    let trajectories = plan
        .iter()
        .map(|e| {
            let origin = Point::new(
                span.center() + params.x_offset + spread(rng, x_spread),
                params.middle_y,
            );
            simulate_particle(rng, params.style, origin, *e, params)
        })
        .filter(|t| !t.samples.is_empty())
        .collect();
    CacheEntry {
        key: note.key,
        start: note.start_frame as f32,
        end: note.end_frame as f32,
        trajectories,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/simulate.rs"]
mod tests;
