use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use la_core::error::CoreError;
use la_core::frame::GrayFrame;

/// Resizer réutilisable wrappant fast_image_resize (luminance U8).
///
/// # Example
/// ```
/// use la_source::resize::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Scratch image for source (owned buffer to avoid the mut borrow issue).
    src_buf: Vec<u8>,
}

impl Resizer {
    /// Create a new resizer (bicubic Catmull-Rom).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new()
                .resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom)),
            src_buf: Vec::new(),
        }
    }

    /// Resize `src` into `dst`. Dimensions of `dst` determine output size.
    ///
    /// # Errors
    /// Returns an error if the resize operation fails.
    ///
    /// # Example
    /// ```
    /// use la_source::resize::Resizer;
    /// use la_core::frame::GrayFrame;
    /// let mut r = Resizer::new();
    /// let src = GrayFrame::new(100, 100);
    /// let mut dst = GrayFrame::new(50, 50);
    /// r.resize_into(&src, &mut dst).unwrap();
    /// ```
    pub fn resize_into(&mut self, src: &GrayFrame, dst: &mut GrayFrame) -> Result<()> {
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        // fast_image_resize exige &mut sur la source
        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8)
                .context("Invalid source dimensions")?;

        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8)
                .context("Invalid destination dimensions")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("Resize failed")?;

        Ok(())
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Dimensions cibles pour tenir dans `budget` pixels.
///
/// Si `width × height > budget`, les deux côtés sont multipliés par
/// `√(budget / (width × height))` puis tronqués (minimum 1). Sinon inchangés.
/// Pour une image très fine, le côté ramené à 1 force l'autre à
/// `budget / 1` : le produit reste `≤ budget` (pour `budget ≥ 1`).
///
/// # Example
/// ```
/// use la_source::resize::budget_dimensions;
/// assert_eq!(budget_dimensions(100, 50, 10_000), (100, 50));
/// assert_eq!(budget_dimensions(100, 50, 1_250), (50, 25));
/// ```
#[must_use]
pub fn budget_dimensions(width: u32, height: u32, budget: u64) -> (u32, u32) {
    let pixels = u64::from(width) * u64::from(height);
    if pixels <= budget {
        return (width, height);
    }
    let scale = (budget as f64 / pixels as f64).sqrt();
    // Epsilon : 74.999999 doit tronquer à 75.
    let shrink = |side: u32| ((f64::from(side) * scale + 1e-6).floor() as u32).max(1);
    let (mut nw, mut nh) = (shrink(width), shrink(height));
    if u64::from(nw) * u64::from(nh) > budget {
        let cap = |fixed: u32, side: u32| {
            (budget / u64::from(fixed)).clamp(1, u64::from(side)) as u32
        };
        if nw <= nh {
            nh = cap(nw, nh);
        } else {
            nw = cap(nh, nw);
        }
    }
    (nw, nh)
}

/// Réduit une frame pour respecter le budget de pixels.
///
/// # Errors
/// `InvalidDimensions` pour une frame vide, `Config` pour un budget nul.
///
/// # Example
/// ```
/// use la_source::resize::fit_to_budget;
/// use la_core::frame::GrayFrame;
/// let src = GrayFrame::new(100, 50);
/// let dst = fit_to_budget(&src, 1_250).unwrap();
/// assert_eq!((dst.width, dst.height), (50, 25));
/// ```
pub fn fit_to_budget(src: &GrayFrame, budget: u64) -> Result<GrayFrame> {
    if src.width == 0 || src.height == 0 {
        return Err(CoreError::InvalidDimensions {
            width: src.width,
            height: src.height,
        }
        .into());
    }
    if budget == 0 {
        return Err(CoreError::Config("budget de pixels nul".into()).into());
    }
    let (width, height) = budget_dimensions(src.width, src.height, budget);
    if (width, height) == (src.width, src.height) {
        return Ok(src.clone());
    }
    log::trace!(
        "fit_to_budget: {}x{} -> {width}x{height} (budget {budget})",
        src.width,
        src.height
    );
    let mut dst = GrayFrame::new(width, height);
    Resizer::new().resize_into(src, &mut dst)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_budget_untouched() {
        assert_eq!(budget_dimensions(100, 50, 5_000), (100, 50));
        assert_eq!(budget_dimensions(100, 50, 10_000), (100, 50));
    }

    #[test]
    fn never_increases_pixel_count() {
        for &(w, h) in &[(1920, 1080), (640, 480), (333, 777), (5000, 20), (1, 9999)] {
            for &budget in &[1u64, 100, 2_000, 10_000, 15_000] {
                let (nw, nh) = budget_dimensions(w, h, budget);
                assert!(
                    u64::from(nw) * u64::from(nh) <= u64::from(w) * u64::from(h),
                    "{w}x{h} budget {budget} -> {nw}x{nh}"
                );
            }
        }
    }

    #[test]
    fn thin_images_stay_within_budget() {
        assert_eq!(budget_dimensions(1, 9999, 100), (1, 100));
        assert_eq!(budget_dimensions(9999, 1, 100), (100, 1));
        for &(w, h) in &[(1, 9999), (9999, 1), (5000, 20), (20, 5000), (3, 40_000)] {
            for &budget in &[1u64, 7, 100, 2_000] {
                let (nw, nh) = budget_dimensions(w, h, budget);
                assert!(
                    u64::from(nw) * u64::from(nh) <= budget,
                    "{w}x{h} budget {budget} -> {nw}x{nh}"
                );
                assert!(nw >= 1 && nh >= 1);
            }
        }
        let src = GrayFrame::from_raw(1, 9999, vec![90; 9999]).unwrap();
        let dst = fit_to_budget(&src, 100).unwrap();
        assert!(dst.pixel_count() <= 100);
    }

    #[test]
    fn preserves_aspect_ratio() {
        for &(w, h) in &[(1920, 1080), (640, 480), (1280, 720), (4032, 3024)] {
            for &budget in &[2_000u64, 10_000, 15_000] {
                let (nw, nh) = budget_dimensions(w, h, budget);
                assert!(u64::from(nw) * u64::from(nh) <= budget);
                let before = f64::from(w) / f64::from(h);
                let after = f64::from(nw) / f64::from(nh);
                assert!(
                    ((after - before) / before).abs() < 0.01,
                    "{w}x{h} budget {budget} -> {nw}x{nh}"
                );
            }
        }
    }

    #[test]
    fn fit_resamples_uniform_frame() {
        let src = GrayFrame::from_raw(40, 20, vec![200; 800]).unwrap();
        let dst = fit_to_budget(&src, 200).unwrap();
        assert_eq!((dst.width, dst.height), (20, 10));
        assert!(dst.data.iter().all(|&v| v.abs_diff(200) <= 1));
    }

    #[test]
    fn degenerate_source_rejected() {
        let src = GrayFrame {
            data: Vec::new(),
            width: 0,
            height: 10,
        };
        assert!(fit_to_budget(&src, 100).is_err());
    }
}
