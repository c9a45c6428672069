use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Sink contract for consuming rendered frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, one call
/// per frame, no seeking.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> PianovidResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> PianovidResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> PianovidResult<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn begin(&mut self, cfg: SinkConfig) -> PianovidResult<()> {
        (**self).begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> PianovidResult<()> {
        (**self).push_frame(idx, frame)
    }

    fn end(&mut self) -> PianovidResult<()> {
        (**self).end()
    }
}

/// Shared checks for sinks: started, ordered, and matching size.
pub(crate) fn check_frame(
    cfg: Option<&SinkConfig>,
    last: Option<FrameIndex>,
    idx: FrameIndex,
    frame: &RenderFrame,
) -> PianovidResult<()> {
    let cfg = cfg.ok_or_else(|| PianovidError::evaluation("sink not started"))?;
    if let Some(last) = last
        && idx.0 <= last.0
    {
        return Err(PianovidError::evaluation(format!(
            "sink received out-of-order frame {} after {}",
            idx.0, last.0
        )));
    }
    if frame.width() != cfg.width || frame.height() != cfg.height {
        return Err(PianovidError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            cfg.width,
            cfg.height
        )));
    }
    Ok(())
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    pub(crate) frames: Vec<(FrameIndex, RenderFrame)>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, RenderFrame)] {
        &self.frames
    }

    /// Whether `end` was called after the last `begin`.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PianovidResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> PianovidResult<()> {
        let last = self.frames.last().map(|(i, _)| *i);
        check_frame(self.cfg.as_ref(), last, idx, frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PianovidResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
