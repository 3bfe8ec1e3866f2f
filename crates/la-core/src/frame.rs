use std::fmt;

use crate::error::CoreError;

/// Buffer de luminance mono-canal, row-major, 1 byte par pixel.
///
/// # Example
/// ```
/// use la_core::frame::GrayFrame;
/// let fb = GrayFrame::new(10, 4);
/// assert_eq!(fb.data.len(), 40);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    /// Luminance, row-major.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl GrayFrame {
    /// Crée un buffer noir aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Wrap an existing luminance buffer.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidDimensions` if either dimension is zero or
    /// if `data.len() != width × height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CoreError> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Nombre total de pixels.
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Luminance du pixel (x, y).
    #[inline(always)]
    #[must_use]
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Ligne `y` du buffer.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }
}

/// Grille de caractères issue de la quantification d'une frame.
///
/// Une ligne par ligne de pixels échantillonnée, une colonne par pixel.
/// Immuable après construction.
///
/// # Example
/// ```
/// use la_core::frame::AsciiCanvas;
/// let canvas = AsciiCanvas::from_rows(&["#@", "..", "::"]).unwrap();
/// assert_eq!(canvas.height(), 3);
/// assert_eq!(canvas.to_text(), "#@\n::");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiCanvas {
    cells: Vec<char>,
    width: u32,
    height: u32,
}

impl AsciiCanvas {
    /// Build a canvas from a flat row-major cell array.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidDimensions` if `cells.len() != width × height`.
    pub fn from_cells(width: u32, height: u32, cells: Vec<char>) -> Result<Self, CoreError> {
        if cells.len() != width as usize * height as usize {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            cells,
            width,
            height,
        })
    }

    /// Build a canvas from equal-length text rows.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidDimensions` if rows differ in length.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, CoreError> {
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count());
        let mut cells = Vec::with_capacity(width * rows.len());
        for row in rows {
            let before = cells.len();
            cells.extend(row.as_ref().chars());
            if cells.len() - before != width {
                return Err(CoreError::InvalidDimensions {
                    width: width as u32,
                    height: rows.len() as u32,
                });
            }
        }
        Self::from_cells(width as u32, rows.len() as u32, cells)
    }

    /// Width in characters.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in characters (row count).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Caractère en (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> char {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[char]> {
        // chunks_exact(0) panique : un canvas de largeur nulle n'a pas de ligne exploitable.
        let w = (self.width as usize).max(1);
        self.cells
            .chunks_exact(w)
            .take(if self.width == 0 { 0 } else { self.height as usize })
    }

    /// Sérialise le canvas en texte.
    ///
    /// Seules les lignes paires (0, 2, 4, …) sont émises : une cellule de
    /// police fait environ deux fois sa largeur en hauteur. Les lignes impaires
    /// sont abandonnées. Pas de saut de ligne final.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out =
            String::with_capacity((self.width as usize + 1) * self.height as usize / 2 + 1);
        for (i, row) in self.rows().step_by(2).enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.extend(row.iter());
        }
        out
    }
}

impl fmt::Display for AsciiCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
