//! Encoding sinks.
//!
//! Sinks consume rendered frames in presentation order and are driven by the compositor's export
//! loop.

/// `ffmpeg`-based MP4 output.
pub mod ffmpeg;
/// PNG image-sequence output.
pub mod images;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;

pub use ffmpeg::{FfmpegSink, ensure_parent_dir, is_ffmpeg_on_path};
pub use images::ImageSequenceSink;
pub use sink::{FrameSink, InMemorySink, SinkConfig};

use crate::config::settings::{OutputFormat, OutputSettings};

/// Sink selected by `output.format`, writing to `output.path`.
pub fn sink_for_output(output: &OutputSettings) -> Box<dyn FrameSink> {
    match output.format {
        OutputFormat::Video => Box::new(FfmpegSink::new(&output.path, output.overwrite)),
        OutputFormat::Images => Box::new(ImageSequenceSink::new(&output.path, output.overwrite)),
    }
}
