/// Export modules for lumascii: plain text, rasterized PNG, terminal, video.

pub mod muxer;
pub mod rasterizer;
pub mod target;
pub mod text;

pub use rasterizer::Rasterizer;
pub use target::{ExportMode, ExportTarget, export};
