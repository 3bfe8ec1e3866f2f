use std::path::Path;

use anyhow::{Context, Result};
use la_core::error::CoreError;
use la_core::frame::GrayFrame;
use la_core::traits::Source;

use crate::resize::fit_to_budget;

/// Source d'image statique : livre la frame une seule fois puis s'épuise.
///
/// # Example
/// ```no_run
/// use la_source::image::ImageSource;
/// use std::path::Path;
/// let source = ImageSource::new(Path::new("test.png")).unwrap();
/// ```
pub struct ImageSource {
    frame: Option<GrayFrame>,
    size: (u32, u32),
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// Returns an error if the image is missing or cannot be decoded.
    pub fn new(path: &Path) -> Result<Self> {
        let frame = load_gray(path)?;
        Ok(Self::from_frame(frame))
    }

    /// Wrap an in-memory frame.
    #[must_use]
    pub fn from_frame(frame: GrayFrame) -> Self {
        let size = (frame.width, frame.height);
        Self {
            frame: Some(frame),
            size,
        }
    }
}

impl Source for ImageSource {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        Ok(self.frame.take())
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Charge une image et la réduit en luminance mono-canal.
///
/// # Errors
/// `ResourceMissing` si le fichier n'existe pas, `DecodeFailure` si le
/// décodage échoue, `InvalidDimensions` pour une image de taille nulle.
pub fn load_gray(path: &Path) -> Result<GrayFrame> {
    if !path.is_file() {
        return Err(CoreError::ResourceMissing {
            path: path.display().to_string(),
        }
        .into());
    }
    let img = ::image::open(path).map_err(|e| CoreError::DecodeFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    Ok(GrayFrame::from_raw(width, height, luma.into_raw())?)
}

/// Pipeline d'échantillonnage complet : chargement, niveaux de gris, budget.
///
/// # Errors
/// Returns an error if the image cannot be loaded or resized.
///
/// # Example
/// ```no_run
/// use la_source::image::sample_image;
/// use std::path::Path;
/// let frame = sample_image(Path::new("photo.jpg"), 10_000).unwrap();
/// assert!(frame.pixel_count() <= 10_000);
/// ```
pub fn sample_image(path: &Path, budget: u64) -> Result<GrayFrame> {
    let frame = load_gray(path)?;
    fit_to_budget(&frame, budget).with_context(|| format!("Réduction de {}", path.display()))
}

/// Écrit une frame en PNG niveaux de gris.
///
/// # Errors
/// Returns an error if the file cannot be encoded or written.
pub fn save_gray(frame: &GrayFrame, path: &Path) -> Result<()> {
    let img = ::image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or(CoreError::InvalidDimensions {
            width: frame.width,
            height: frame.height,
        })?;
    img.save(path)
        .with_context(|| format!("Impossible d'écrire {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> GrayFrame {
        let data = (0..w * h).map(|i| (i % 256) as u8).collect();
        GrayFrame::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn save_then_load_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        let frame = gradient(17, 9);
        save_gray(&frame, &path).unwrap();
        assert_eq!(load_gray(&path).unwrap(), frame);
    }

    #[test]
    fn rgb_image_is_reduced_to_luma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let img = ::image::RgbImage::from_pixel(4, 2, ::image::Rgb([255, 255, 255]));
        img.save(&path).unwrap();
        let frame = load_gray(&path).unwrap();
        assert_eq!((frame.width, frame.height), (4, 2));
        assert!(frame.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn missing_file_is_resource_missing() {
        let err = load_gray(Path::new("/nonexistent/absent.png")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::ResourceMissing { .. })
        ));
    }

    #[test]
    fn garbage_file_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = load_gray(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn image_source_yields_once() {
        let mut src = ImageSource::from_frame(gradient(3, 3));
        assert_eq!(src.native_size(), (3, 3));
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_none());
        assert!(!src.is_live());
    }

    #[test]
    fn sample_image_respects_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        save_gray(&gradient(200, 100), &path).unwrap();
        let frame = sample_image(&path, 5_000).unwrap();
        assert_eq!((frame.width, frame.height), (100, 50));
    }
}
