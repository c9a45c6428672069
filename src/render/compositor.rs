use std::sync::mpsc;

use crate::config::params::ParamMap;
use crate::config::settings::Settings;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::foundation::report::{Reporter, Severity};
use crate::piano::KeyGeometry;
use crate::render::blocks::BlockLayout;
use crate::render::blur::{blur_frame, fade_blur_radius};
use crate::render::frame::RenderFrame;
use crate::render::jobs::{
    BackdropJob, BlocksJob, FrameContext, FrameJob, GlareJob, KeyboardJob, LightBarJob,
    OctaveLinesJob, ParticleJob,
};
use crate::render::layers::KeyboardLayer;
use crate::timeline::Timeline;

const ENCODER_QUEUE: usize = 4;

/// Everything that stays fixed across the frames of one render.
#[derive(Clone, Debug)]
pub struct Scene {
    timeline: Timeline,
    geometry: KeyGeometry,
    params: ParamMap,
    canvas: Canvas,
    fps: Fps,
    middle_y: f64,
    intro_frames: f64,
    ending_frames: f64,
    fade_frames: f64,
}

impl Scene {
    pub fn new(timeline: Timeline, geometry: KeyGeometry, settings: &Settings) -> PianovidResult<Self> {
        let out = &settings.output;
        Ok(Self {
            timeline,
            geometry,
            params: settings.params()?,
            canvas: out.canvas(),
            fps: out.fps,
            middle_y: out.middle_y(),
            intro_frames: out.fps.secs_to_frames(out.intro_pause_secs),
            ending_frames: out.fps.secs_to_frames(out.ending_pause_secs),
            fade_frames: out.fps.secs_to_frames(out.fade_secs),
        })
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn geometry(&self) -> &KeyGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Timeline frame shown at output `frame`: `frame - intro + first_start`.
    pub fn note_frame(&self, frame: FrameIndex) -> f64 {
        frame.0 as f64 - self.intro_frames + self.timeline.first_start()
    }

    /// `intro + (last_end - first_start) + ending`, rounded up.
    pub fn total_frames(&self) -> u64 {
        let total = self.intro_frames + self.timeline.span_frames() + self.ending_frames;
        if total > 0.0 { total.ceil() as u64 } else { 0 }
    }

    /// Whole output range.
    pub fn range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames()),
        }
    }

    /// Linear intro/outro ramp in `[0, 1]`; 1 outside the fade windows.
    pub fn fade_factor(&self, frame: FrameIndex) -> f64 {
        if self.fade_frames <= 0.0 {
            return 1.0;
        }
        let last = self.total_frames().saturating_sub(1) as f64;
        let f = frame.0 as f64;
        let fac_in = f / self.fade_frames;
        let fac_out = (last - f) / self.fade_frames;
        fac_in.min(fac_out).clamp(0.0, 1.0)
    }

    pub fn context(&self, frame: FrameIndex) -> FrameContext<'_> {
        FrameContext {
            frame,
            note_frame: self.note_frame(frame),
            canvas: self.canvas,
            fps: self.fps,
            middle_y: self.middle_y,
            timeline: &self.timeline,
            geometry: &self.geometry,
            params: &self.params,
        }
    }
}

/// Range export statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Frames pushed to the sink.
    pub frames: u64,
    /// Frames on which at least one job failed.
    pub degraded_frames: u64,
}

/// Runs the frame jobs in layer order over a fresh buffer per frame.
#[derive(Default)]
pub struct Compositor {
    builtins: Vec<Box<dyn FrameJob>>,
    jobs: Vec<Box<dyn FrameJob>>,
    reporter: Reporter,
}

impl Compositor {
    /// Compositor with no jobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in layers for `settings`: octave lines, particles (in the given order), blocks,
    /// backdrop, keyboard, light bar, glare.
    pub fn from_settings(
        settings: &Settings,
        particles: Vec<ParticleJob>,
        keyboard: Option<KeyboardLayer>,
    ) -> Self {
        let mut c = Self::new();
        let blocks = &settings.blocks;
        if blocks.octave_lines {
            c.builtins.push(Box::new(OctaveLinesJob {
                x_offset: blocks.x_offset,
            }));
        }
        for p in particles {
            c.builtins.push(Box::new(p));
        }
        c.builtins.push(Box::new(BlocksJob {
            layout: BlockLayout::from_settings(settings),
            style: blocks.clone(),
        }));
        c.builtins.push(Box::new(BackdropJob {
            color: settings.keyboard.backdrop.rgb(),
        }));
        if let Some(layer) = keyboard {
            c.builtins.push(Box::new(KeyboardJob { layer }));
        }
        if settings.light_bar.enabled {
            c.builtins.push(Box::new(LightBarJob {
                settings: settings.light_bar.clone(),
                x_offset: blocks.x_offset,
            }));
        }
        if settings.effects.glare.enabled {
            c.builtins.push(Box::new(GlareJob {
                settings: settings.effects.glare.clone(),
                x_offset: blocks.x_offset,
            }));
        }
        c
    }

    /// Add a job that runs after the built-in layers, before the fade.
    pub fn register_job(&mut self, job: Box<dyn FrameJob>) {
        self.jobs.push(job);
    }

    /// Job names in run order.
    pub fn job_names(&self) -> Vec<&str> {
        self.builtins
            .iter()
            .chain(&self.jobs)
            .map(|j| j.name())
            .collect()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Render one frame. Job failures are reported, not returned.
    pub fn render_frame(&mut self, scene: &Scene, frame: FrameIndex) -> PianovidResult<RenderFrame> {
        Ok(self.render_counted(scene, frame)?.0)
    }

    fn render_counted(&mut self, scene: &Scene, frame: FrameIndex) -> PianovidResult<(RenderFrame, usize)> {
        let ctx = scene.context(frame);
        let mut pixels = RenderFrame::new(ctx.canvas);
        let mut failed = 0;
        for job in self.builtins.iter_mut().chain(self.jobs.iter_mut()) {
            if let Err(e) = job.run(&ctx, &mut pixels) {
                failed += 1;
                self.reporter
                    .report(Severity::Error, job.name(), e.to_string());
            }
        }

        let fac = scene.fade_factor(frame);
        if fac < 1.0 {
            pixels = blur_frame(&pixels, fade_blur_radius(fac))?;
            pixels.scale(fac as f32);
        }
        Ok((pixels, failed))
    }
}

/// Render `range` and stream the frames into `sink`.
///
/// Frames are rendered in order on the calling thread and encoded on a second thread behind a
/// bounded queue.
#[tracing::instrument(skip(compositor, scene, sink), fields(frames = range.len_frames()))]
pub fn export_video(
    compositor: &mut Compositor,
    scene: &Scene,
    range: FrameRange,
    sink: &mut dyn FrameSink,
) -> PianovidResult<ExportStats> {
    if range.is_empty() {
        return Err(PianovidError::validation("export range must be non-empty"));
    }
    let cfg = SinkConfig {
        width: scene.canvas.width,
        height: scene.canvas.height,
        fps: scene.fps,
    };
    let log_every = (range.len_frames() / 10).max(1);

    std::thread::scope(|scope| -> PianovidResult<ExportStats> {
        let (tx, rx) = mpsc::sync_channel::<(FrameIndex, RenderFrame)>(ENCODER_QUEUE);
        let enc = scope.spawn(move || -> PianovidResult<()> {
            sink.begin(cfg)?;
            for (idx, frame) in rx {
                sink.push_frame(idx, &frame)?;
            }
            sink.end()
        });

        let mut stats = ExportStats::default();
        let produce = (|| -> PianovidResult<()> {
            for f in range.start.0..range.end.0 {
                let (frame, failed) = compositor.render_counted(scene, FrameIndex(f))?;
                if failed > 0 {
                    stats.degraded_frames += 1;
                }
                tx.send((FrameIndex(f), frame)).map_err(|_| {
                    PianovidError::evaluation("encoder thread is not accepting frames")
                })?;
                stats.frames += 1;
                if stats.frames % log_every == 0 {
                    tracing::info!(frame = f, done = stats.frames, "export progress");
                }
            }
            Ok(())
        })();

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| PianovidError::evaluation("encoder thread panicked"))?;
        // A sink error closes the channel, so report it ahead of the send failure it caused.
        enc_res?;
        produce?;
        Ok(stats)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
