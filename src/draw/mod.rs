//! Drawable output for a host renderer
//!
//! The simulation never draws. It hands out plain-old-data instances that a
//! renderer can upload as-is, plus the palette rules used to color them.

pub mod instance;
pub mod palette;

pub use instance::{BallInstance, build_instances};
pub use palette::{DEFAULT_PALETTE, color_index, color_to_rgba, text_is_dark};
