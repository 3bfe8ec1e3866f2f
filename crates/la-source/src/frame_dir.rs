use anyhow::Result;
use la_core::frame::GrayFrame;
use la_core::traits::Source;
use std::path::{Path, PathBuf};

use crate::image::load_gray;

/// Chemin de la frame `index` : `<dir>/<prefix><index>.png`.
///
/// # Example
/// ```
/// use la_source::frame_dir::frame_path;
/// use std::path::Path;
/// assert_eq!(frame_path(Path::new("data"), "frame", 7), Path::new("data/frame7.png"));
/// ```
#[must_use]
pub fn frame_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{prefix}{index}.png"))
}

/// Source qui parcourt une séquence de frames numérotées dans un dossier de travail.
///
/// Les indices vont de 0 à `len() - 1`, sans trou.
pub struct FrameDirSource {
    files: Vec<PathBuf>,
    current_idx: usize,
}

impl FrameDirSource {
    /// Séquence de `count` frames numérotées.
    #[must_use]
    pub fn new(dir: &Path, prefix: &str, count: usize) -> Self {
        Self {
            files: (0..count).map(|i| frame_path(dir, prefix, i)).collect(),
            current_idx: 0,
        }
    }

    /// Compte les frames consécutives présentes à partir de l'indice 0.
    #[must_use]
    pub fn scan(dir: &Path, prefix: &str) -> Self {
        let count = (0..)
            .take_while(|&i| frame_path(dir, prefix, i).is_file())
            .count();
        Self::new(dir, prefix, count)
    }

    /// Nombre de frames dans la séquence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True si la séquence ne contient aucune frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Source for FrameDirSource {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        let Some(path) = self.files.get(self.current_idx) else {
            return Ok(None);
        };
        let frame = load_gray(path)?;
        self.current_idx += 1;
        Ok(Some(frame))
    }

    fn native_size(&self) -> (u32, u32) {
        self.files
            .first()
            .and_then(|p| ::image::image_dimensions(p).ok())
            .unwrap_or((0, 0))
    }

    fn is_live(&self) -> bool {
        false
    }
}
