use anyhow::{Context, Result};
use la_core::frame::AsciiCanvas;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// `<base>.<ext>` sans toucher aux points déjà présents dans `base`.
///
/// # Example
/// ```
/// use la_export::text::artifact_path;
/// use std::path::Path;
/// assert_eq!(artifact_path(Path::new("out/v1.2"), "txt"), Path::new("out/v1.2.txt"));
/// ```
#[must_use]
pub fn artifact_path(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Écrit la sérialisation texte du canvas dans `<base>.txt` (UTF-8, écrase).
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn export_text(canvas: &AsciiCanvas, base: &Path) -> Result<PathBuf> {
    let path = artifact_path(base, "txt");
    std::fs::write(&path, canvas.to_text())
        .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::info!("Export texte : {}", path.display());
    Ok(path)
}
