//! Per-note particle effects: simulation, on-disk cache, and drawing.
//!
//! Dots, smoke, and stars are simulated once per note, written to a cache directory, and
//! replayed frame by frame. Glare is cheap and drawn procedurally every frame.

pub mod cache;
pub mod draw;
pub mod fingerprint;
pub mod format;
pub mod glare;
pub mod simulate;

pub use cache::{
    BuildStamp, CacheBuild, CacheBuildReport, CacheProgress, CacheReader, EffectCache,
    ParticleSample, ParticleSink, build_cache, frame_base, partition, render_frame,
};
pub use draw::ParticleDrawer;
pub use simulate::EffectParams;

use crate::config::settings::{EffectsSettings, ParticleEffectSettings, ParticleStyle};

/// The cached particle effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Dots rising from pressed keys; one continuous stream per note.
    Dots,
    /// Smoke; one continuous stream per note.
    Smoke,
    /// At most one star per note.
    Stars,
}

impl EffectKind {
    /// Draw order of the particle layers.
    pub const ALL: [EffectKind; 3] = [EffectKind::Dots, EffectKind::Smoke, EffectKind::Stars];

    /// Directory name under the cache root.
    pub fn id(self) -> &'static str {
        match self {
            Self::Dots => "dots",
            Self::Smoke => "smoke",
            Self::Stars => "stars",
        }
    }

    /// Style used when the settings do not name one.
    pub fn default_style(self) -> ParticleStyle {
        match self {
            Self::Dots => ParticleStyle::Floating,
            Self::Smoke => ParticleStyle::Rising,
            Self::Stars => ParticleStyle::Star,
        }
    }

    /// Continuous emitters cover the whole note; stars are a single burst.
    pub fn is_continuous(self) -> bool {
        !matches!(self, Self::Stars)
    }

    pub fn settings(self, effects: &EffectsSettings) -> &ParticleEffectSettings {
        match self {
            Self::Dots => &effects.dots,
            Self::Smoke => &effects.smoke,
            Self::Stars => &effects.stars,
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
