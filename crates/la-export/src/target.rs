use anyhow::Result;
use la_core::error::CoreError;
use la_core::frame::AsciiCanvas;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::rasterizer::Rasterizer;
use crate::text::export_text;

/// Mode d'export choisi par l'utilisateur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportMode {
    /// `<nom>.txt`
    Text,
    /// `<nom>.png`
    Image,
    /// Sortie standard.
    Terminal,
}

impl FromStr for ExportMode {
    type Err = CoreError;

    /// # Example
    /// ```
    /// use la_export::ExportMode;
    /// assert_eq!("txt".parse::<ExportMode>().unwrap(), ExportMode::Text);
    /// assert!("gif".parse::<ExportMode>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "img" | "image" | "png" => Ok(Self::Image),
            "term" | "terminal" => Ok(Self::Terminal),
            _ => Err(CoreError::InvalidExportMode(s.to_string())),
        }
    }
}

/// Destination d'un canvas, avec ses paramètres.
pub enum ExportTarget<'a> {
    Text { base: PathBuf },
    Image {
        base: PathBuf,
        rasterizer: &'a Rasterizer,
    },
    Terminal,
}

impl<'a> ExportTarget<'a> {
    /// Associe un mode à un nom de base. Le rasterizer n'est requis que pour `Image`.
    ///
    /// # Errors
    /// `ResourceMissing` si le mode `Image` est demandé sans rasterizer.
    pub fn from_mode(
        mode: ExportMode,
        base: &Path,
        rasterizer: Option<&'a Rasterizer>,
    ) -> Result<Self, CoreError> {
        Ok(match mode {
            ExportMode::Text => Self::Text {
                base: base.to_path_buf(),
            },
            ExportMode::Image => Self::Image {
                base: base.to_path_buf(),
                rasterizer: rasterizer.ok_or_else(|| CoreError::ResourceMissing {
                    path: "<police>".into(),
                })?,
            },
            ExportMode::Terminal => Self::Terminal,
        })
    }

    /// Mode correspondant.
    #[must_use]
    pub fn mode(&self) -> ExportMode {
        match self {
            Self::Text { .. } => ExportMode::Text,
            Self::Image { .. } => ExportMode::Image,
            Self::Terminal => ExportMode::Terminal,
        }
    }
}

/// Exporte le canvas vers la cible. `out` ne sert qu'au mode terminal.
///
/// Retourne le chemin du fichier écrit, `None` pour le terminal.
///
/// # Errors
/// Toute erreur d'écriture ou de rendu.
pub fn export(
    canvas: &AsciiCanvas,
    target: &ExportTarget<'_>,
    out: &mut dyn Write,
) -> Result<Option<PathBuf>> {
    match target {
        ExportTarget::Text { base } => export_text(canvas, base).map(Some),
        ExportTarget::Image { base, rasterizer } => rasterizer.export_png(canvas, base).map(Some),
        ExportTarget::Terminal => {
            writeln!(out, "{canvas}")?;
            out.flush()?;
            Ok(None)
        }
    }
}
