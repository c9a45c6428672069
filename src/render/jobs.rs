//! Built-in frame jobs, one per layer.

use crate::config::params::ParamMap;
use crate::config::settings::{BlocksSettings, GlareSettings, LightBarSettings};
use crate::effects::glare::draw_glare;
use crate::effects::{CacheReader, EffectKind, EffectParams, ParticleDrawer};
use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgb8};
use crate::foundation::error::PianovidResult;
use crate::piano::KeyGeometry;
use crate::render::blocks::{BlockLayout, dim_top, draw_blocks, draw_octave_lines};
use crate::render::frame::RenderFrame;
use crate::render::layers::{KeyboardLayer, draw_light_bar, fill_backdrop, light_bar_intensity};
use crate::timeline::Timeline;

const SMOKE_GRAY: u8 = 190;

/// What a frame job sees of the current frame.
///
/// Jobs get the timeline and configuration read-only; the pixel buffer is the only thing they
/// may change.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    /// Output frame number.
    pub frame: FrameIndex,
    /// Same instant in timeline frames.
    pub note_frame: f64,
    pub canvas: Canvas,
    pub fps: Fps,
    /// Keyboard line.
    pub middle_y: f64,
    pub timeline: &'a Timeline,
    pub geometry: &'a KeyGeometry,
    /// Flat `section.field` configuration.
    pub params: &'a ParamMap,
}

impl FrameContext<'_> {
    /// `(key, center x)` of every note held at this frame.
    pub fn sounding_centers(&self, x_offset: f64) -> Vec<(u8, f64)> {
        self.timeline
            .sounding_at(self.note_frame)
            .map(|n| (n.key, self.geometry.key_center(usize::from(n.key)) + x_offset))
            .collect()
    }
}

/// One layer of the per-frame compositing loop.
pub trait FrameJob: Send {
    /// Name used in failure reports.
    fn name(&self) -> &str;

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()>;
}

/// Guide line at every C.
pub struct OctaveLinesJob {
    pub x_offset: f64,
}

impl FrameJob for OctaveLinesJob {
    fn name(&self) -> &str {
        "octave_lines"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        draw_octave_lines(pixels, ctx.geometry, self.x_offset, ctx.middle_y);
        Ok(())
    }
}

/// Replays one effect cache.
pub struct ParticleJob {
    reader: CacheReader,
    params: EffectParams,
    color: Rgb8,
}

impl ParticleJob {
    pub fn new(reader: CacheReader, params: EffectParams) -> Self {
        let color = match params.kind {
            EffectKind::Smoke => Rgb8::gray(SMOKE_GRAY),
            EffectKind::Dots | EffectKind::Stars => Rgb8::white(),
        };
        Self {
            reader,
            params,
            color,
        }
    }
}

impl FrameJob for ParticleJob {
    fn name(&self) -> &str {
        self.params.kind.id()
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        let mut drawer = ParticleDrawer::new(
            pixels,
            self.params.intensity,
            self.params.glow,
            self.params.motion_blur,
        )
        .with_color(self.color);
        self.reader.render_note_frame(ctx.note_frame, &mut drawer);
        Ok(())
    }
}

/// Falling blocks, then the top dimming.
pub struct BlocksJob {
    pub layout: BlockLayout,
    pub style: BlocksSettings,
}

impl FrameJob for BlocksJob {
    fn name(&self) -> &str {
        "blocks"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        draw_blocks(
            pixels,
            ctx.timeline.notes(),
            ctx.note_frame,
            ctx.geometry,
            &self.layout,
            &self.style,
        );
        if self.style.dim_top {
            dim_top(pixels);
        }
        Ok(())
    }
}

/// Keyboard-area fill.
pub struct BackdropJob {
    pub color: Rgb8,
}

impl FrameJob for BackdropJob {
    fn name(&self) -> &str {
        "backdrop"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        fill_backdrop(pixels, ctx.middle_y, self.color);
        Ok(())
    }
}

pub struct KeyboardJob {
    pub layer: KeyboardLayer,
}

impl FrameJob for KeyboardJob {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        self.layer.draw(pixels, ctx.note_frame, ctx.middle_y)
    }
}

pub struct LightBarJob {
    pub settings: LightBarSettings,
    pub x_offset: f64,
}

impl FrameJob for LightBarJob {
    fn name(&self) -> &str {
        "light_bar"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        let centers = ctx.sounding_centers(self.x_offset);
        let intensity = light_bar_intensity(
            ctx.canvas.width,
            centers.iter().map(|(_, x)| *x),
            self.settings.radius,
        );
        draw_light_bar(pixels, &intensity, ctx.middle_y, &self.settings);
        Ok(())
    }
}

pub struct GlareJob {
    pub settings: GlareSettings,
    pub x_offset: f64,
}

impl FrameJob for GlareJob {
    fn name(&self) -> &str {
        "glare"
    }

    fn run(&mut self, ctx: &FrameContext<'_>, pixels: &mut RenderFrame) -> PianovidResult<()> {
        let centers = ctx.sounding_centers(self.x_offset);
        draw_glare(pixels, centers, ctx.middle_y, &self.settings, ctx.frame.0);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/jobs.rs"]
mod tests;
