//! Keyboard footage: perspective crop, grading, sources, and calibration preview.

pub mod crop;
pub mod grade;
pub mod preview;
pub mod source;

pub use crop::{CalibrationQuad, Homography, ProjectiveCrop, apply_crop, compute_crop};
pub use grade::KeyboardGrade;
pub use preview::{draw_calibration, save_png};
pub use source::{
    KeyboardSource, StillImage, VideoInfo, VideoReader, open_source, probe_video,
    source_frame_index,
};
