use ab_glyph::{Font, FontRef, PxScale, point};
use anyhow::{Context, Result};
use image::GrayImage;
use la_core::error::CoreError;
use la_core::frame::AsciiCanvas;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::text::artifact_path;

/// Fond blanc, glyphes noirs.
const BACKGROUND: u8 = 255;

/// Rend un `AsciiCanvas` en bitmap niveaux de gris, une cellule fixe par glyphe.
///
/// Toutes les lignes du canvas sont dessinées (pas de saut d'une ligne sur deux,
/// contrairement à l'export texte). Les glyphes sont pré-rasterisés une fois
/// dans un cache alpha.
pub struct Rasterizer {
    cell_width: u32,
    cell_height: u32,
    /// Alpha `cell_width * cell_height` par caractère.
    glyph_cache: HashMap<char, Vec<u8>>,
    /// Cellule vide pour les caractères absents de la police.
    empty_glyph: Vec<u8>,
}

impl Rasterizer {
    /// Construit le cache pour l'ASCII imprimable plus les glyphes `extra`
    /// (typiquement la rampe courante).
    ///
    /// # Errors
    /// Retourne une erreur si la police est invalide ou si la cellule est vide.
    pub fn new(
        font_data: &[u8],
        font_size: f32,
        cell_width: u32,
        cell_height: u32,
        extra: &[char],
    ) -> Result<Self> {
        if cell_width == 0 || cell_height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: cell_width,
                height: cell_height,
            }
            .into());
        }
        let font = FontRef::try_from_slice(font_data).context("Police TrueType invalide")?;
        let scale = PxScale::from(font_size);

        let mut rasterizer = Self {
            cell_width,
            cell_height,
            glyph_cache: HashMap::new(),
            empty_glyph: vec![0u8; (cell_width * cell_height) as usize],
        };
        let printable = (32u8..=126).map(char::from);
        for ch in printable.chain(extra.iter().copied()) {
            if !rasterizer.glyph_cache.contains_key(&ch) {
                rasterizer.cache_glyph(&font, scale, ch);
            }
        }
        log::debug!(
            "Rasterizer: {} glyphes en cache, cellule {}x{}",
            rasterizer.glyph_cache.len(),
            cell_width,
            cell_height
        );
        Ok(rasterizer)
    }

    fn cache_glyph(&mut self, font: &FontRef, scale: PxScale, ch: char) {
        // glyph_id 0 = .notdef : on laisse la cellule vide.
        let gid = font.glyph_id(ch);
        if gid.0 == 0 {
            log::warn!("Glyphe absent de la police : {ch:?}");
            return;
        }
        let mut buffer = vec![0u8; (self.cell_width * self.cell_height) as usize];
        let ascent_px = font.ascent_unscaled() * scale.y / font.height_unscaled();
        let glyph = gid.with_scale_and_position(scale, point(0.0, ascent_px));

        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            let (cw, cell_h) = (self.cell_width, self.cell_height);
            #[allow(clippy::cast_possible_wrap)]
            outline.draw(|x, y, v| {
                let px = x as i32 + bounds.min.x as i32;
                let py = y as i32 + bounds.min.y as i32;
                if px >= 0 && py >= 0 && (px as u32) < cw && (py as u32) < cell_h {
                    let idx = (py as u32 * cw + px as u32) as usize;
                    buffer[idx] = buffer[idx].max((v * 255.0).round() as u8);
                }
            });
        }
        self.glyph_cache.insert(ch, buffer);
    }

    /// Dimensions du bitmap pour un canvas `grid_w × grid_h`.
    #[must_use]
    pub fn target_dimensions(&self, grid_w: u32, grid_h: u32) -> (u32, u32) {
        (grid_w * self.cell_width, grid_h * self.cell_height)
    }

    /// Rasterise le canvas : cellule `(x, y)` en `(x * cell_w, y * cell_h)`.
    ///
    /// # Errors
    /// `InvalidDimensions` si le canvas est vide.
    pub fn render(&self, canvas: &AsciiCanvas) -> Result<GrayImage> {
        let (width, height) = self.target_dimensions(canvas.width(), canvas.height());
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: canvas.width(),
                height: canvas.height(),
            }
            .into());
        }

        let cw = self.cell_width as usize;
        let chh = self.cell_height as usize;
        let stride = width as usize;
        let band_size = stride * chh;
        let mut pixels = vec![BACKGROUND; stride * height as usize];

        pixels
            .par_chunks_exact_mut(band_size)
            .zip(canvas.rows().collect::<Vec<_>>())
            .for_each(|(band, row)| {
                for (gx, ch) in row.iter().enumerate() {
                    let alpha = self.glyph_cache.get(ch).unwrap_or(&self.empty_glyph);
                    let x0 = gx * cw;
                    for cy in 0..chh {
                        let src = &alpha[cy * cw..(cy + 1) * cw];
                        let dst = &mut band[cy * stride + x0..cy * stride + x0 + cw];
                        for (d, &a) in dst.iter_mut().zip(src) {
                            *d = BACKGROUND - a;
                        }
                    }
                }
            });

        GrayImage::from_raw(width, height, pixels)
            .context("Buffer de rendu incohérent avec les dimensions")
    }

    /// Rasterise puis écrit `<base>.png`.
    ///
    /// # Errors
    /// Rendu impossible ou écriture PNG échouée.
    pub fn export_png(&self, canvas: &AsciiCanvas, base: &Path) -> Result<PathBuf> {
        let img = self.render(canvas)?;
        let path = artifact_path(base, "png");
        img.save(&path)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        log::info!("Export image : {} ({}x{})", path.display(), img.width(), img.height());
        Ok(path)
    }
}
