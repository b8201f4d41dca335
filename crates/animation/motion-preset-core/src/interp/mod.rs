//! Interpolation helpers.
//!
//! Linear blending plus the CSS timing functions used by presets: the four
//! cubic-bezier keywords and the two step functions.

pub mod functions;

pub use functions::{bezier_ease, lerp};
