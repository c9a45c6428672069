//! pianovid renders piano performance videos.
//!
//! A render combines a MIDI timeline, cached per-note particle effects, and perspective-cropped
//! footage of a keyboard. The public API is session-oriented:
//!
//! - Load and validate [`Settings`]
//! - Create a [`RenderSession`] (builds the timeline, key layout, effect caches, and crop)
//! - Render single frames or stream the whole video into a [`FrameSink`]
#![forbid(unsafe_code)]

/// Settings document and the flat parameter view.
pub mod config;
/// Per-note particle effects and their on-disk cache.
pub mod effects;
/// Encoding sinks.
pub mod encode;
/// Core types, errors, and failure reporting.
pub mod foundation;
/// Keyboard footage: crop, grade, sources.
pub mod keyboard;
/// Piano key layout.
pub mod piano;
/// Per-frame compositing.
pub mod render;
/// Session-oriented rendering API.
pub mod session;
/// MIDI to note timeline.
pub mod timeline;

pub use crate::config::params::{ParamMap, ParamValue};
pub use crate::config::settings::Settings;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgb8, Rgba8};
pub use crate::foundation::error::{PianovidError, PianovidResult};
pub use crate::foundation::report::{Report, Reporter, Severity};

pub use crate::effects::{EffectCache, EffectKind};
pub use crate::encode::ffmpeg::FfmpegSink;
pub use crate::encode::images::ImageSequenceSink;
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::keyboard::{CalibrationQuad, ProjectiveCrop, compute_crop};
pub use crate::piano::KeyGeometry;
pub use crate::render::{Compositor, FrameContext, FrameJob, RenderFrame, Scene};
pub use crate::session::RenderSession;
pub use crate::timeline::{Note, Timeline, build_timeline};
