/// Visual source modules for lumascii (image, frame folder, video, webcam).
///
/// Every source yields grayscale `GrayFrame`s through `la_core::traits::Source`.

pub mod frame_dir;
pub mod image;
pub mod resize;
pub mod video;
pub mod webcam;
