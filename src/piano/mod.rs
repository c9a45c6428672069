pub mod keys;

pub use keys::{KeyGeometry, KeySpan, WHITE_KEY_COUNT, is_white_key};
