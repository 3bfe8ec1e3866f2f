/// Configuration, types, and shared structures for lumascii.
///
/// This crate contains the glyph ramp, the grayscale frame and ASCII canvas
/// types, the `Source` trait and the configuration logic shared across the
/// lumascii workspace.

pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use charset::{GlyphRamp, LuminanceLut};
pub use config::AppConfig;
pub use error::CoreError;
pub use frame::{AsciiCanvas, GrayFrame};
pub use traits::Source;
