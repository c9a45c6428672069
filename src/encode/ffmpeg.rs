use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context;

use crate::encode::sink::{FrameSink, SinkConfig, check_frame};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

/// x264 quality used unless [`FfmpegSink::with_crf`] says otherwise.
pub const DEFAULT_CRF: u8 = 18;

/// MP4 output through the system `ffmpeg`, fed raw RGB24 frames on stdin.
pub struct FfmpegSink {
    path: PathBuf,
    overwrite: bool,
    crf: u8,
    encoder: Option<Encoder>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

/// A running `ffmpeg` process with its stderr drained on a side thread.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
}

impl FfmpegSink {
    pub fn new(path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            path: path.into(),
            overwrite,
            crf: DEFAULT_CRF,
            encoder: None,
            cfg: None,
            last_idx: None,
        }
    }

    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arguments for encoding `cfg` into this sink's file.
    pub fn command_args(&self, cfg: &SinkConfig) -> Vec<String> {
        let mut args: Vec<String> = [
            if self.overwrite { "-y" } else { "-n" },
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.extend([
            "-s".to_string(),
            format!("{}x{}", cfg.width, cfg.height),
            "-r".to_string(),
            format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i".to_string(),
            "pipe:0".to_string(),
        ]);
        args.extend(
            ["-an", "-c:v", "libx264", "-crf"]
                .into_iter()
                .map(String::from),
        );
        args.push(self.crf.to_string());
        args.extend(
            ["-pix_fmt", "yuv420p", "-movflags", "+faststart"]
                .into_iter()
                .map(String::from),
        );
        args.push(self.path.display().to_string());
        args
    }

    fn spawn(&self, cfg: &SinkConfig) -> PianovidResult<Encoder> {
        let mut child = Command::new("ffmpeg")
            .args(self.command_args(cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PianovidError::evaluation(format!("failed to start ffmpeg: {e}")))?;
        let stdin = child.stdin.take();
        let mut pipe = child
            .stderr
            .take()
            .ok_or_else(|| PianovidError::evaluation("ffmpeg stderr unavailable"))?;
        let stderr = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            pipe.read_to_end(&mut bytes)?;
            Ok(bytes)
        });
        Ok(Encoder {
            child,
            stdin,
            stderr,
        })
    }
}

/// Even, non-zero dimensions and a usable rate; yuv420p halves both axes.
fn check_config(cfg: &SinkConfig) -> PianovidResult<()> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(PianovidError::validation("fps must be non-zero"));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(PianovidError::validation("video size must be non-zero"));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(PianovidError::validation(format!(
            "video size {}x{} must be even",
            cfg.width, cfg.height
        )));
    }
    Ok(())
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> PianovidResult<()> {
        check_config(&cfg)?;
        ensure_parent_dir(&self.path)?;
        if !self.overwrite && self.path.exists() {
            return Err(PianovidError::validation(format!(
                "output file '{}' already exists",
                self.path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(PianovidError::evaluation(
                "ffmpeg was not found on PATH; use image output instead",
            ));
        }

        self.encoder = Some(self.spawn(&cfg)?);
        tracing::debug!(
            path = %self.path.display(),
            width = cfg.width,
            height = cfg.height,
            crf = self.crf,
            "ffmpeg started"
        );
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderFrame) -> PianovidResult<()> {
        check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        let stdin = self
            .encoder
            .as_mut()
            .and_then(|e| e.stdin.as_mut())
            .ok_or_else(|| PianovidError::evaluation("ffmpeg is not running"))?;
        stdin
            .write_all(frame.data())
            .map_err(|e| PianovidError::evaluation(format!("ffmpeg stopped reading frames: {e}")))?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> PianovidResult<()> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| PianovidError::evaluation("ffmpeg sink not started"))?;
        drop(encoder.stdin.take());
        let status = encoder
            .child
            .wait()
            .map_err(|e| PianovidError::evaluation(format!("waiting for ffmpeg failed: {e}")))?;
        let log = match encoder.stderr.join() {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Ok(Err(e)) => format!("<stderr unreadable: {e}>"),
            Err(_) => String::new(),
        };
        self.cfg = None;
        if !status.success() {
            return Err(PianovidError::evaluation(format!(
                "ffmpeg exited with {status}: {log}"
            )));
        }
        tracing::debug!(path = %self.path.display(), "ffmpeg finished");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            drop(encoder.stdin.take());
            let _ = encoder.child.kill();
            let _ = encoder.child.wait();
        }
    }
}

/// Create the directory `path` will be written into.
pub fn ensure_parent_dir(path: &Path) -> PianovidResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub fn is_ffmpeg_on_path() -> bool {
    runs("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    runs("ffprobe")
}

fn runs(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
