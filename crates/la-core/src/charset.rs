use crate::error::CoreError;

/// 12 caractères : rampe par défaut (inversé: dense→clair).
pub const CHARSET_DEFAULT: &str = "#@&${(=*;:. ";

/// Rampe de glyphes ordonnée du plus dense (index 0, pixel sombre) au plus
/// clair (dernier index, pixel blanc).
///
/// Immuable une fois construite, partagée en lecture par toutes les conversions.
///
/// # Example
/// ```
/// use la_core::charset::GlyphRamp;
/// let ramp = GlyphRamp::default();
/// assert_eq!(ramp.len(), 12);
/// assert_eq!(ramp.glyph(0), '#');
/// assert_eq!(ramp.glyph(11), ' ');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Build a ramp from a string ordered densest→lightest.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the string is empty.
    pub fn new(charset: &str) -> Result<Self, CoreError> {
        let glyphs: Vec<char> = charset.chars().collect();
        if glyphs.is_empty() {
            return Err(CoreError::Config("la rampe de glyphes est vide".into()));
        }
        Ok(Self { glyphs })
    }

    /// Nombre de glyphes (L).
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Toujours faux : une rampe vide est refusée à la construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyphe à l'index donné. L'index est borné à `len() - 1`.
    #[must_use]
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    /// Index de rampe pour une luminance : `floor(v × L / 256)`, borné à [0, L−1].
    ///
    /// # Example
    /// ```
    /// use la_core::charset::GlyphRamp;
    /// let ramp = GlyphRamp::default();
    /// assert_eq!(ramp.index_of(0), 0);
    /// assert_eq!(ramp.index_of(128), 6);
    /// assert_eq!(ramp.index_of(255), 11);
    /// ```
    #[inline]
    #[must_use]
    pub fn index_of(&self, luminance: u8) -> usize {
        let len = self.glyphs.len();
        (usize::from(luminance) * len / 256).min(len - 1)
    }

    /// True si `ch` fait partie de la rampe.
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        self.glyphs.contains(&ch)
    }

    /// Glyphes dans l'ordre dense→clair.
    #[must_use]
    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: CHARSET_DEFAULT.chars().collect(),
        }
    }
}

/// Lookup table mapping luminance [0..255] → character.
///
/// Pre-computed from a `GlyphRamp` for O(1) per-pixel cost.
///
/// # Example
/// ```
/// use la_core::charset::{GlyphRamp, LuminanceLut};
/// let lut = LuminanceLut::new(&GlyphRamp::default());
/// assert_eq!(lut.map(0), '#');
/// assert_eq!(lut.map(255), ' ');
/// ```
pub struct LuminanceLut {
    lut: [char; 256],
}

impl LuminanceLut {
    /// Build a LUT from a ramp ordered densest→lightest.
    #[must_use]
    pub fn new(ramp: &GlyphRamp) -> Self {
        let mut lut = [' '; 256];
        for (v, slot) in (0..=u8::MAX).zip(lut.iter_mut()) {
            *slot = ramp.glyph(ramp.index_of(v));
        }
        Self { lut }
    }

    /// Map a luminance value [0..255] to a character.
    #[inline(always)]
    #[must_use]
    pub fn map(&self, luminance: u8) -> char {
        self.lut[luminance as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARSET_COMPACT: &str = "@%#*+=-:. ";
    /// Paul Bourke, 70 glyphes.
    const CHARSET_FULL: &str =
        "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

    #[test]
    fn empty_ramp_rejected() {
        assert!(matches!(GlyphRamp::new(""), Err(CoreError::Config(_))));
    }

    #[test]
    fn index_extremes_for_every_length() {
        for len in 1..=70 {
            let charset: String = CHARSET_FULL.chars().take(len).collect();
            let ramp = GlyphRamp::new(&charset).unwrap();
            assert_eq!(ramp.index_of(0), 0);
            assert_eq!(ramp.index_of(255), len - 1, "L = {len}");
        }
    }

    #[test]
    fn index_monotonic_and_bounded() {
        let ramp = GlyphRamp::new(CHARSET_COMPACT).unwrap();
        let mut prev = 0usize;
        for v in 0..=255u8 {
            let idx = ramp.index_of(v);
            assert!(idx >= prev, "index non monotone à luminance {v}");
            assert!(idx < ramp.len());
            prev = idx;
        }
    }

    #[test]
    fn midpoint_of_default_ramp() {
        let ramp = GlyphRamp::default();
        // floor(128 / 256 × 12) = 6
        assert_eq!(ramp.index_of(128), 6);
        assert_eq!(ramp.glyph(6), '=');
    }

    #[test]
    fn single_glyph_ramp() {
        let ramp = GlyphRamp::new("x").unwrap();
        assert_eq!(ramp.index_of(0), 0);
        assert_eq!(ramp.index_of(255), 0);
    }

    #[test]
    fn lut_agrees_with_ramp() {
        let ramp = GlyphRamp::default();
        let lut = LuminanceLut::new(&ramp);
        for v in 0..=255u8 {
            assert_eq!(lut.map(v), ramp.glyph(ramp.index_of(v)));
        }
    }
}
