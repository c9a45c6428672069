use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::Context;

use crate::foundation::core::Fps;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::render::frame::RenderFrame;

/// Keyboard footage addressed by frame number.
pub trait KeyboardSource: Send {
    /// Frame rate of the footage, or `None` for a still.
    fn fps(&self) -> Option<f64>;

    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Decode frame `index` (0-based).
    fn frame(&mut self, index: u64) -> PianovidResult<&RenderFrame>;
}

/// Footage frame shown at a note-relative output frame.
///
/// `floor(video_start * video_fps + note_frame / out_fps * video_fps)`, clamped at 0.
pub fn source_frame_index(note_frame: f64, out_fps: f64, video_start_secs: f64, video_fps: f64) -> u64 {
    let f = (video_start_secs * video_fps + note_frame / out_fps * video_fps).floor();
    if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
}

/// One image used for every frame.
pub struct StillImage {
    frame: RenderFrame,
}

impl StillImage {
    pub fn open(path: &Path) -> PianovidResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("open keyboard image '{}'", path.display()))?
            .to_rgb8();
        Ok(Self::from_frame(RenderFrame::from_image(img)))
    }

    pub fn from_frame(frame: RenderFrame) -> Self {
        Self { frame }
    }
}

impl KeyboardSource for StillImage {
    fn fps(&self) -> Option<f64> {
        None
    }

    fn size(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn frame(&mut self, _index: u64) -> PianovidResult<&RenderFrame> {
        Ok(&self.frame)
    }
}

/// Stream facts reported by `ffprobe`.
#[derive(Clone, Debug)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

pub fn probe_video(path: &Path) -> PianovidResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| PianovidError::evaluation(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(PianovidError::evaluation(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| PianovidError::evaluation(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| PianovidError::evaluation("no video stream found"))?;
    let width = stream
        .width
        .ok_or_else(|| PianovidError::evaluation("missing video width from ffprobe"))?;
    let height = stream
        .height
        .ok_or_else(|| PianovidError::evaluation("missing video height from ffprobe"))?;
    let fps = Fps::parse(stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .map_err(|e| PianovidError::evaluation(format!("invalid video r_frame_rate: {e}")))?;

    Ok(VideoInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps,
    })
}

/// Sequential decoder over a video file.
///
/// Keeps the last decoded frame. Reading forward decodes and discards frames up to the
/// requested one; reading backward restarts the decoder. Past the end of the stream the last
/// frame repeats.
pub struct VideoReader {
    info: VideoInfo,
    decoder: Option<(Child, ChildStdout)>,
    last_index: Option<u64>,
    last: RenderFrame,
    scratch: Vec<u8>,
    exhausted: bool,
}

impl VideoReader {
    pub fn open(path: &Path) -> PianovidResult<Self> {
        let info = probe_video(path)?;
        let last = RenderFrame::new(crate::foundation::core::Canvas {
            width: info.width,
            height: info.height,
        });
        let scratch = vec![0; last.data().len()];
        Ok(Self {
            info,
            decoder: None,
            last_index: None,
            last,
            scratch,
            exhausted: false,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn reset(&mut self) -> PianovidResult<()> {
        self.stop();
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                PianovidError::evaluation(format!("failed to run ffmpeg for video decode: {e}"))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PianovidError::evaluation("ffmpeg stdout was not captured"))?;
        self.decoder = Some((child, stdout));
        self.last_index = None;
        self.exhausted = false;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((mut child, _)) = self.decoder.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Decode one more frame; `false` once the stream has ended after at least one frame.
    fn next(&mut self) -> PianovidResult<bool> {
        let next = self.last_index.map_or(0, |i| i + 1);
        let Some((_, stdout)) = self.decoder.as_mut() else {
            return Err(PianovidError::evaluation("video decoder is not running"));
        };
        match stdout.read_exact(&mut self.scratch) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && self.last_index.is_some() => {
                tracing::debug!(
                    path = %self.info.path.display(),
                    frames = next,
                    "end of keyboard video, repeating last frame"
                );
                self.exhausted = true;
                return Ok(false);
            }
            Err(e) => {
                return Err(PianovidError::evaluation(format!(
                    "error decoding frame {next} of video '{}': {e}",
                    self.info.path.display()
                )));
            }
        }
        self.last.data_mut().copy_from_slice(&self.scratch);
        self.last_index = Some(next);
        Ok(true)
    }
}

impl KeyboardSource for VideoReader {
    fn fps(&self) -> Option<f64> {
        Some(self.info.fps.as_f64())
    }

    fn size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame(&mut self, index: u64) -> PianovidResult<&RenderFrame> {
        let backwards = self.last_index.is_some_and(|last| index < last);
        if self.decoder.is_none() || backwards {
            self.reset()?;
        }
        while !self.exhausted && self.last_index.is_none_or(|last| last < index) {
            if !self.next()? {
                break;
            }
        }
        Ok(&self.last)
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open a still image (by extension) or a video file.
pub fn open_source(path: &Path) -> PianovidResult<Box<dyn KeyboardSource>> {
    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "bmp" | "webp"
            )
        });
    if is_image {
        Ok(Box::new(StillImage::open(path)?))
    } else {
        Ok(Box::new(VideoReader::open(path)?))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/source.rs"]
mod tests;
