use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::encode::sink::{FrameSink, SinkConfig, check_frame};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

/// Writes every frame as `<dir>/<frame>.png`.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    overwrite: bool,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    written: u64,
}

impl ImageSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
            cfg: None,
            last_idx: None,
            written: 0,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the PNG for frame `idx`.
    pub fn frame_path(&self, idx: FrameIndex) -> PathBuf {
        self.dir.join(format!("{}.png", idx.0))
    }

    /// Frames written since `begin`.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> PianovidResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(PianovidError::validation(
                "image sink width/height must be non-zero",
            ));
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create image directory '{}'", self.dir.display()))?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> PianovidResult<()> {
        check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);

        let path = self.frame_path(idx);
        if !self.overwrite && path.exists() {
            return Err(PianovidError::validation(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }
        frame
            .to_image()?
            .save(&path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> PianovidResult<()> {
        if self.cfg.take().is_none() {
            return Err(PianovidError::evaluation("image sink not started"));
        }
        tracing::debug!(dir = %self.dir.display(), frames = self.written, "image sequence written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/images.rs"]
mod tests;
