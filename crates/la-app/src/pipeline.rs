use std::path::Path;

use anyhow::Result;
use la_ascii::luminance::Quantizer;
use la_core::charset::GlyphRamp;
use la_core::frame::{AsciiCanvas, GrayFrame};
use la_source::image::load_gray;
use la_source::resize::fit_to_budget;

/// Chaîne de conversion d'une frame : réduction au budget puis quantification.
///
/// Sans état mutable : partageable entre threads rayon.
pub struct Converter {
    quantizer: Quantizer,
}

impl Converter {
    #[must_use]
    pub fn new(ramp: GlyphRamp) -> Self {
        Self {
            quantizer: Quantizer::new(ramp),
        }
    }

    /// Frame déjà décodée → canvas.
    ///
    /// # Errors
    /// Budget nul ou frame dégénérée.
    pub fn convert_frame(&self, frame: &GrayFrame, budget: u64) -> Result<AsciiCanvas> {
        let sampled = fit_to_budget(frame, budget)?;
        log::trace!(
            "convert_frame: {}x{} → {}x{}",
            frame.width,
            frame.height,
            sampled.width,
            sampled.height
        );
        Ok(self.quantizer.quantize(&sampled)?)
    }

    /// Fichier image → canvas.
    ///
    /// # Errors
    /// `ResourceMissing` / `DecodeFailure` si l'image est absente ou illisible.
    pub fn convert_image(&self, path: &Path, budget: u64) -> Result<AsciiCanvas> {
        let frame = load_gray(path)?;
        let canvas = self.convert_frame(&frame, budget)?;
        log::info!(
            "{} : {}x{} → {}x{} caractères",
            path.display(),
            frame.width,
            frame.height,
            canvas.width(),
            canvas.height()
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use la_core::error::CoreError;
    use la_source::image::save_gray;

    fn gradient(w: u32, h: u32) -> GrayFrame {
        let data = (0..w * h).map(|i| ((i % w) * 255 / (w - 1)) as u8).collect();
        GrayFrame::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn under_budget_keeps_size() {
        let conv = Converter::new(GlyphRamp::default());
        let canvas = conv.convert_frame(&gradient(100, 50), 10_000).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (100, 50));
        assert_eq!(canvas.to_text().lines().count(), 25);
    }

    #[test]
    fn over_budget_shrinks() {
        let conv = Converter::new(GlyphRamp::default());
        let canvas = conv.convert_frame(&gradient(100, 50), 1_250).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (50, 25));
    }

    #[test]
    fn same_image_same_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        save_gray(&gradient(120, 80), &path).unwrap();
        let conv = Converter::new(GlyphRamp::default());
        let a = conv.convert_image(&path, 2_000).unwrap();
        let b = conv.convert_image(&path, 2_000).unwrap();
        assert_eq!(a, b);
        assert!(u64::from(a.width()) * u64::from(a.height()) <= 2_000);
    }

    #[test]
    fn missing_image_is_resource_missing() {
        let conv = Converter::new(GlyphRamp::default());
        let err = conv.convert_image(Path::new("/nonexistent/x.png"), 100).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::ResourceMissing { .. })
        ));
    }
}
