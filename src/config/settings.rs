use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::params::ParamMap;
use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::{PianovidError, PianovidResult};

/// Complete render configuration.
///
/// This is the JSON-facing, human-edited document. It is validated once and then handed by
/// reference to each component, which only reads its own section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Output video parameters.
    pub output: OutputSettings,
    /// MIDI inputs and timeline post-processing.
    pub midi: MidiSettings,
    /// Piano key calibration.
    pub piano: PianoSettings,
    /// Falling block appearance.
    pub blocks: BlocksSettings,
    /// Keyboard footage and its calibration.
    pub keyboard: KeyboardSettings,
    /// Key-press highlight bar.
    pub light_bar: LightBarSettings,
    /// Particle effects and glare.
    pub effects: EffectsSettings,
}

/// Container produced by the exporter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One MP4 file encoded by `ffmpeg`.
    #[default]
    Video,
    /// One PNG per frame in the output directory.
    Images,
}

/// Output video parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Video file or image directory.
    pub format: OutputFormat,
    /// MP4 path, or directory for image sequences.
    pub path: PathBuf,
    /// Overwrite an existing output file.
    pub overwrite: bool,
    /// Seconds rendered before the first note reaches the keyboard.
    pub intro_pause_secs: f64,
    /// Seconds rendered after the last note ends.
    pub ending_pause_secs: f64,
    /// Length of the blur/opacity ramp at each end; 0 disables it.
    pub fade_secs: f64,
    /// Vertical position of the keyboard line as a fraction of the height.
    pub middle_fac: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: Fps { num: 30, den: 1 },
            format: OutputFormat::Video,
            path: PathBuf::from("out.mp4"),
            overwrite: true,
            intro_pause_secs: 0.0,
            ending_pause_secs: 1.0,
            fade_secs: 0.0,
            middle_fac: 0.5,
        }
    }
}

impl OutputSettings {
    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Keyboard line in pixels from the top.
    pub fn middle_y(&self) -> f64 {
        f64::from(self.height) * self.middle_fac
    }
}

/// MIDI inputs and timeline post-processing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MidiSettings {
    /// MIDI files, concatenated in order.
    pub paths: Vec<PathBuf>,
    /// Seconds to shift the timeline earlier.
    pub time_offset_secs: f64,
    /// Lengthen very short notes so fast repetitions stay visible.
    pub stabilize: Option<StabilizeSettings>,
}

/// Short-note stretching policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StabilizeSettings {
    /// Notes shorter than this (in frames) are stretched.
    pub threshold_frames: f64,
    /// Stretched notes last exactly this many frames.
    pub min_frames: f64,
}

/// Piano key calibration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PianoSettings {
    /// Pixels between the left frame edge and the lowest key.
    pub left_offset: f64,
    /// Pixels between the highest key and the right frame edge.
    pub right_offset: f64,
    /// Black key width relative to a white key.
    pub black_width_fac: f64,
}

impl Default for PianoSettings {
    fn default() -> Self {
        Self {
            left_offset: 0.0,
            right_offset: 0.0,
            black_width_fac: 0.5,
        }
    }
}

/// Falling block appearance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlocksSettings {
    /// Screens per second.
    pub speed: f64,
    /// Horizontal shift applied to blocks and particles.
    pub x_offset: f64,
    /// Fill color.
    pub color: Rgba8,
    /// Corner radius in pixels.
    pub rounding: f64,
    /// Border thickness in pixels; 0 disables the border.
    pub border: f64,
    /// Border color.
    pub border_color: Rgba8,
    /// Draw a soft halo around each block.
    pub glow: bool,
    /// Halo color.
    pub glow_color: Rgba8,
    /// Minimum drawn block height in pixels.
    pub min_height: f64,
    /// Vertical guide line at every C key.
    pub octave_lines: bool,
    /// Darken the top of the frame.
    pub dim_top: bool,
}

impl Default for BlocksSettings {
    fn default() -> Self {
        Self {
            speed: 0.2,
            x_offset: 0.0,
            color: Rgba8([195, 165, 50, 255]),
            rounding: 8.0,
            border: 0.5,
            border_color: Rgba8([220, 210, 210, 255]),
            glow: true,
            glow_color: Rgba8([255, 220, 200, 90]),
            min_height: 0.0,
            octave_lines: true,
            dim_top: true,
        }
    }
}

/// Keyboard footage and its calibration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardSettings {
    /// Draw the keyboard layer.
    pub enabled: bool,
    /// Video file, or a still image (png/jpg/bmp) used for every frame.
    pub source: Option<PathBuf>,
    /// Time in the footage (seconds) where the first note is played.
    pub video_start_secs: f64,
    /// Keyboard corners in source pixels: top-left, top-right, bottom-right, bottom-left.
    pub crop: [[f64; 2]; 4],
    /// Source pixels below the keyboard to keep, fading to black.
    pub mask: f64,
    /// Vertical stretch of the cropped keyboard.
    pub height_fac: f64,
    /// Subtracted from every channel (0..255).
    pub sub_dim: f64,
    /// Every channel is multiplied by this.
    pub mult_dim: f64,
    /// Per-channel multipliers.
    pub rgb_mod: [f64; 3],
    /// Fill color of the lower half behind the keyboard.
    pub backdrop: Rgba8,
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            source: None,
            video_start_secs: 0.0,
            crop: [[0.0, 0.0], [1920.0, 0.0], [1920.0, 1080.0], [0.0, 1080.0]],
            mask: 200.0,
            height_fac: 1.0,
            sub_dim: 10.0,
            mult_dim: 0.8,
            rgb_mod: [1.0, 1.0, 1.0],
            backdrop: Rgba8([0, 0, 0, 255]),
        }
    }
}

/// Key-press highlight bar.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightBarSettings {
    /// Draw the bar.
    pub enabled: bool,
    /// Half width of one key's light in pixels.
    pub radius: f64,
    /// Bar height in pixels.
    pub height: u32,
}

impl Default for LightBarSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 160.0,
            height: 8,
        }
    }
}

/// Motion model of a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticleStyle {
    /// Slow upward drift with random wobble.
    Floating,
    /// Thrown up, falls back and bounces on the keyboard line.
    Bouncing,
    /// Fast sideways burst under gravity.
    Sparks,
    /// Smoke: constant slow rise.
    Rising,
    /// Star: one upward arc.
    Star,
}

/// One cached particle effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticleEffectSettings {
    /// Build and draw this effect.
    pub enabled: bool,
    /// Motion model; each effect has its own default.
    pub style: Option<ParticleStyle>,
    /// Particles emitted per second of note duration.
    pub particles_per_second: f64,
    /// Base particle lifetime in seconds.
    pub lifetime_secs: f64,
    /// Random lifetime variation in frames (+/-).
    pub lifetime_jitter_frames: u32,
    /// Random emission time variation in frames (+/-).
    pub emit_jitter_frames: f64,
    /// Chance that a note produces this effect at all.
    pub probability: f64,
    /// Draw a glow footprint around each particle.
    pub glow: bool,
    /// Draw a short trail toward the previous sample.
    pub motion_blur: bool,
    /// Brightness multiplier.
    pub intensity: f64,
}

impl Default for ParticleEffectSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            style: None,
            particles_per_second: 20.0,
            lifetime_secs: 1.5,
            lifetime_jitter_frames: 10,
            emit_jitter_frames: 2.0,
            probability: 1.0,
            glow: true,
            motion_blur: true,
            intensity: 1.0,
        }
    }
}

/// Procedural glare around pressed keys.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlareSettings {
    /// Draw glare.
    pub enabled: bool,
    /// Brightness multiplier.
    pub intensity: f64,
    /// Radius in pixels.
    pub radius: f64,
    /// Per-frame random intensity variation.
    pub jitter: f64,
}

impl Default for GlareSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 1.0,
            radius: 75.0,
            jitter: 0.1,
        }
    }
}

/// Particle effects and glare.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsSettings {
    /// Root directory of the effect caches.
    pub cache_dir: PathBuf,
    /// Parallel cache workers.
    pub workers: usize,
    /// Fixed seed for reproducible caches.
    pub seed: Option<u64>,
    /// Dots rising from pressed keys.
    pub dots: ParticleEffectSettings,
    /// Smoke.
    pub smoke: ParticleEffectSettings,
    /// Occasional stars.
    pub stars: ParticleEffectSettings,
    /// Glare.
    pub glare: GlareSettings,
}

impl Default for EffectsSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".pianovid-cache"),
            workers: 4,
            seed: None,
            dots: ParticleEffectSettings {
                enabled: true,
                ..ParticleEffectSettings::default()
            },
            smoke: ParticleEffectSettings {
                particles_per_second: 30.0,
                lifetime_secs: 2.0,
                glow: false,
                ..ParticleEffectSettings::default()
            },
            stars: ParticleEffectSettings {
                probability: 0.25,
                lifetime_secs: 1.0,
                ..ParticleEffectSettings::default()
            },
            glare: GlareSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> PianovidResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| PianovidError::validation(format!("parse settings JSON: {e}")))
    }

    /// Parse settings from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> PianovidResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PianovidError::validation(format!("open settings JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> PianovidResult<()> {
        let o = &self.output;
        if o.width == 0 || o.height == 0 || o.width % 2 != 0 || o.height % 2 != 0 {
            return Err(PianovidError::validation(
                "output width/height must be non-zero and even",
            ));
        }
        Fps::new(o.fps.num, o.fps.den)?;
        if !(o.middle_fac > 0.0 && o.middle_fac < 1.0) {
            return Err(PianovidError::validation(
                "output.middle_fac must be in (0, 1)",
            ));
        }
        for (name, v) in [
            ("output.intro_pause_secs", o.intro_pause_secs),
            ("output.ending_pause_secs", o.ending_pause_secs),
            ("output.fade_secs", o.fade_secs),
            ("keyboard.mask", self.keyboard.mask),
            ("blocks.min_height", self.blocks.min_height),
            ("blocks.rounding", self.blocks.rounding),
            ("blocks.border", self.blocks.border),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(PianovidError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !(self.blocks.speed > 0.0) {
            return Err(PianovidError::validation("blocks.speed must be > 0"));
        }
        if !(self.piano.black_width_fac > 0.0) {
            return Err(PianovidError::validation(
                "piano.black_width_fac must be > 0",
            ));
        }
        if !(self.keyboard.height_fac > 0.0) {
            return Err(PianovidError::validation(
                "keyboard.height_fac must be > 0",
            ));
        }
        if !(self.light_bar.radius > 0.0) {
            return Err(PianovidError::validation("light_bar.radius must be > 0"));
        }
        if let Some(st) = self.midi.stabilize
            && (st.threshold_frames < 0.0 || st.min_frames < 0.0)
        {
            return Err(PianovidError::validation(
                "midi.stabilize frames must be >= 0",
            ));
        }
        if self.effects.workers == 0 {
            return Err(PianovidError::validation("effects.workers must be >= 1"));
        }
        for (name, fx) in [
            ("effects.dots", &self.effects.dots),
            ("effects.smoke", &self.effects.smoke),
            ("effects.stars", &self.effects.stars),
        ] {
            if !(fx.particles_per_second > 0.0) {
                return Err(PianovidError::validation(format!(
                    "{name}.particles_per_second must be > 0"
                )));
            }
            if !(fx.lifetime_secs > 0.0) {
                return Err(PianovidError::validation(format!(
                    "{name}.lifetime_secs must be > 0"
                )));
            }
            if !(0.0..=1.0).contains(&fx.probability) {
                return Err(PianovidError::validation(format!(
                    "{name}.probability must be in [0, 1]"
                )));
            }
            if !(fx.emit_jitter_frames >= 0.0) {
                return Err(PianovidError::validation(format!(
                    "{name}.emit_jitter_frames must be >= 0"
                )));
            }
        }
        if !(self.effects.glare.radius > 0.0) {
            return Err(PianovidError::validation(
                "effects.glare.radius must be > 0",
            ));
        }
        Ok(())
    }

    /// Flat `section.key` view for frame jobs.
    pub fn params(&self) -> PianovidResult<ParamMap> {
        let value =
            serde_json::to_value(self).map_err(|e| PianovidError::serde(e.to_string()))?;
        Ok(ParamMap::from_json(&value))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
