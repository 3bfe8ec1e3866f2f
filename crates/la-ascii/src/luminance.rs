use la_core::charset::{GlyphRamp, LuminanceLut};
use la_core::error::CoreError;
use la_core::frame::{AsciiCanvas, GrayFrame};
use rayon::prelude::*;

/// Au-delà de ce nombre de pixels, la quantification est parallélisée.
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Quantize a grayscale frame into an ASCII canvas of identical dimensions.
///
/// Each sample maps to `ramp[floor(v × L / 256)]` through the LUT.
/// Deterministic: identical frames always yield identical canvases.
///
/// # Errors
/// `InvalidDimensions` if `frame.data` does not hold `width × height` samples.
///
/// # Example
/// ```
/// use la_core::charset::{GlyphRamp, LuminanceLut};
/// use la_core::frame::GrayFrame;
/// use la_ascii::luminance::quantize;
///
/// let frame = GrayFrame::from_raw(3, 1, vec![0, 128, 255]).unwrap();
/// let lut = LuminanceLut::new(&GlyphRamp::default());
/// let canvas = quantize(&frame, &lut).unwrap();
/// assert_eq!(canvas.to_text(), "#= ");
/// ```
pub fn quantize(frame: &GrayFrame, lut: &LuminanceLut) -> Result<AsciiCanvas, CoreError> {
    let cells: Vec<char> = if frame.data.len() >= PARALLEL_THRESHOLD {
        frame.data.par_iter().map(|&v| lut.map(v)).collect()
    } else {
        frame.data.iter().map(|&v| lut.map(v)).collect()
    };
    AsciiCanvas::from_cells(frame.width, frame.height, cells)
}

/// Quantifieur réutilisable : LUT pré-calculée une fois par rampe.
///
/// # Example
/// ```
/// use la_core::charset::GlyphRamp;
/// use la_core::frame::GrayFrame;
/// use la_ascii::luminance::Quantizer;
///
/// let q = Quantizer::new(GlyphRamp::default());
/// let canvas = q.quantize(&GrayFrame::new(4, 2)).unwrap();
/// assert_eq!(canvas.to_text(), "####");
/// ```
pub struct Quantizer {
    lut: LuminanceLut,
}

impl Quantizer {
    #[must_use]
    pub fn new(ramp: GlyphRamp) -> Self {
        let lut = LuminanceLut::new(&ramp);
        log::debug!("Quantizer: rampe de {} glyphes", ramp.len());
        Self { lut }
    }

    /// # Errors
    /// See [`quantize`].
    pub fn quantize(&self, frame: &GrayFrame) -> Result<AsciiCanvas, CoreError> {
        quantize(frame, &self.lut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_levels() -> GrayFrame {
        GrayFrame::from_raw(256, 1, (0..=255u8).collect()).unwrap()
    }

    #[test]
    fn same_dimensions_as_input() {
        let q = Quantizer::new(GlyphRamp::default());
        let canvas = q.quantize(&GrayFrame::new(7, 5)).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (7, 5));
    }

    #[test]
    fn every_glyph_belongs_to_ramp() {
        let ramp = GlyphRamp::new("@%#*+=-:. ").unwrap();
        let q = Quantizer::new(ramp.clone());
        let canvas = q.quantize(&all_levels()).unwrap();
        for row in canvas.rows() {
            assert!(row.iter().all(|&c| ramp.contains(c)));
        }
    }

    #[test]
    fn glyph_order_follows_luminance() {
        let ramp = GlyphRamp::default();
        let q = Quantizer::new(ramp.clone());
        let canvas = q.quantize(&all_levels()).unwrap();
        let indices: Vec<usize> = (0..256)
            .map(|x| {
                let ch = canvas.get(x, 0);
                ramp.glyphs().iter().position(|&g| g == ch).unwrap()
            })
            .collect();
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(indices[0], 0);
        assert_eq!(indices[255], ramp.len() - 1);
        assert_eq!(indices[128], 6);
    }

    #[test]
    fn parallel_path_matches_sequential() {
        let w = 512u32;
        let h = 256u32;
        let data: Vec<u8> = (0..w * h).map(|i| (i * 7 % 256) as u8).collect();
        let frame = GrayFrame::from_raw(w, h, data).unwrap();
        assert!(frame.data.len() >= PARALLEL_THRESHOLD);
        let lut = LuminanceLut::new(&GlyphRamp::default());
        let canvas = quantize(&frame, &lut).unwrap();
        for (i, &v) in frame.data.iter().enumerate() {
            let (x, y) = (i as u32 % w, i as u32 / w);
            assert_eq!(canvas.get(x, y), lut.map(v));
        }
    }

    #[test]
    fn malformed_frame_rejected() {
        let frame = GrayFrame {
            data: vec![0; 5],
            width: 3,
            height: 3,
        };
        let q = Quantizer::new(GlyphRamp::default());
        assert!(q.quantize(&frame).is_err());
    }

    #[test]
    fn deterministic() {
        let q = Quantizer::new(GlyphRamp::default());
        let frame = all_levels();
        assert_eq!(q.quantize(&frame).unwrap(), q.quantize(&frame).unwrap());
    }
}
