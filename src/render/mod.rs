//! Per-frame compositing: the pixel buffer, layers, and the export loop.

pub mod blocks;
pub mod blur;
pub mod compositor;
pub mod frame;
pub mod jobs;
pub mod layers;

pub use blocks::BlockLayout;
pub use compositor::{Compositor, ExportStats, Scene, export_video};
pub use frame::RenderFrame;
pub use jobs::{FrameContext, FrameJob, ParticleJob};
pub use layers::KeyboardLayer;
