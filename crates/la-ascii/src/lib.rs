/// ASCII conversion engine for lumascii.
///
/// Quantizes grayscale frames into glyph canvases.
pub mod luminance;

pub use luminance::quantize;
