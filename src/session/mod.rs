//! Session-oriented rendering: front-loads the timeline, layout, caches, and crop, then renders
//! frames on demand.

pub mod render_session;

pub use render_session::{RenderSession, effect_caches, keyboard_layer, load_timeline};
