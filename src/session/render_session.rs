use crate::config::settings::Settings;
use crate::effects::{CacheBuildReport, EffectCache, EffectKind, EffectParams};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::foundation::report::Reporter;
use crate::keyboard::{CalibrationQuad, KeyboardGrade, KeyboardSource, compute_crop, open_source};
use crate::piano::KeyGeometry;
use crate::render::compositor::{Compositor, ExportStats, Scene, export_video};
use crate::render::frame::RenderFrame;
use crate::render::jobs::{FrameJob, ParticleJob};
use crate::render::layers::KeyboardLayer;
use crate::timeline::{Timeline, build_timeline};

/// Parse every configured MIDI file into one timeline.
pub fn load_timeline(settings: &Settings) -> PianovidResult<Timeline> {
    let midi = &settings.midi;
    build_timeline(
        &midi.paths,
        settings.output.fps,
        midi.time_offset_secs,
        midi.stabilize,
    )
}

/// Caches of the enabled particle effects, in draw order.
pub fn effect_caches(settings: &Settings) -> Vec<EffectCache> {
    EffectKind::ALL
        .into_iter()
        .filter(|k| k.settings(&settings.effects).enabled)
        .map(|k| {
            EffectCache::new(
                &settings.effects.cache_dir,
                EffectParams::from_settings(k, settings),
                settings.effects.seed,
            )
        })
        .collect()
}

/// Keyboard layer for `source`, cropped to the output width.
pub fn keyboard_layer(
    settings: &Settings,
    source: Box<dyn KeyboardSource>,
) -> PianovidResult<KeyboardLayer> {
    let kb = &settings.keyboard;
    let crop = compute_crop(&CalibrationQuad::from_settings(kb), settings.output.width)?;
    Ok(KeyboardLayer::new(
        source,
        crop,
        KeyboardGrade::from_settings(kb),
        kb.video_start_secs,
        settings.output.fps,
    ))
}

/// Renderer for one settings document.
pub struct RenderSession {
    settings: Settings,
    scene: Scene,
    compositor: Compositor,
    cache_reports: Vec<(EffectKind, CacheBuildReport)>,
}

impl RenderSession {
    /// Build the timeline, layout, effect caches, and keyboard crop for `settings`.
    ///
    /// The keyboard source named in the settings is opened when the keyboard layer is enabled.
    #[tracing::instrument(skip(settings))]
    pub fn new(settings: Settings) -> PianovidResult<Self> {
        let source = match (&settings.keyboard.source, settings.keyboard.enabled) {
            (Some(path), true) => Some(open_source(path)?),
            (None, true) => {
                tracing::info!("no keyboard source configured, keyboard layer skipped");
                None
            }
            (_, false) => None,
        };
        Self::with_keyboard_source(settings, source)
    }

    /// Like [`RenderSession::new`] with an already opened keyboard source.
    pub fn with_keyboard_source(
        settings: Settings,
        source: Option<Box<dyn KeyboardSource>>,
    ) -> PianovidResult<Self> {
        settings.validate()?;
        let timeline = load_timeline(&settings)?;
        if timeline.is_empty() {
            tracing::warn!("timeline has no notes");
        }
        let geometry = KeyGeometry::from_settings(settings.output.width, &settings.piano)?;

        let mut particles = Vec::new();
        let mut cache_reports = Vec::new();
        for cache in effect_caches(&settings) {
            let kind = cache.params().kind;
            if let Some(report) =
                cache.ensure(timeline.notes(), &geometry, settings.effects.workers)?
            {
                for failure in &report.failures {
                    tracing::warn!(effect = %kind, "{failure}");
                }
                cache_reports.push((kind, report));
            }
            particles.push(ParticleJob::new(
                cache.reader(timeline.notes())?,
                cache.params().clone(),
            ));
        }

        let keyboard = match source {
            Some(src) if settings.keyboard.enabled => Some(keyboard_layer(&settings, src)?),
            _ => None,
        };

        let compositor = Compositor::from_settings(&settings, particles, keyboard);
        let scene = Scene::new(timeline, geometry, &settings)?;
        tracing::info!(
            notes = scene.timeline().notes().len(),
            frames = scene.total_frames(),
            "render session ready"
        );
        Ok(Self {
            settings,
            scene,
            compositor,
            cache_reports,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn timeline(&self) -> &Timeline {
        self.scene.timeline()
    }

    /// Reports of the caches rebuilt while opening the session.
    pub fn cache_reports(&self) -> &[(EffectKind, CacheBuildReport)] {
        &self.cache_reports
    }

    pub fn reporter(&self) -> &Reporter {
        self.compositor.reporter()
    }

    pub fn total_frames(&self) -> u64 {
        self.scene.total_frames()
    }

    /// Add a job after the built-in layers.
    pub fn register_job(&mut self, job: Box<dyn FrameJob>) {
        self.compositor.register_job(job);
    }

    /// Render a single output frame.
    pub fn render_frame(&mut self, frame: FrameIndex) -> PianovidResult<RenderFrame> {
        if frame.0 >= self.total_frames() {
            return Err(PianovidError::validation(format!(
                "frame {} is past the end of the video ({} frames)",
                frame.0,
                self.total_frames()
            )));
        }
        self.compositor.render_frame(&self.scene, frame)
    }

    /// Render a frame range and stream it into `sink`.
    pub fn render_range(
        &mut self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
    ) -> PianovidResult<ExportStats> {
        if range.end.0 > self.total_frames() {
            return Err(PianovidError::validation(
                "render range must be within the video duration",
            ));
        }
        export_video(&mut self.compositor, &self.scene, range, sink)
    }

    /// Render the whole video into `sink`.
    pub fn render_to(&mut self, sink: &mut dyn FrameSink) -> PianovidResult<ExportStats> {
        let range = self.scene.range();
        self.render_range(range, sink)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
