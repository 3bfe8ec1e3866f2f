use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::{CHARSET_DEFAULT, GlyphRamp};
use crate::error::CoreError;

/// Configuration complète de l'application.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use la_core::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.image_budget, 10_000);
/// assert_eq!(config.live_budget, 15_000);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppConfig {
    // === Rampe ===
    /// Rampe de glyphes (du plus dense au plus clair).
    pub charset: String,

    // === Échantillonnage ===
    /// Budget de pixels pour une image statique.
    pub image_budget: u64,
    /// Budget de pixels par frame vidéo.
    pub frame_budget: u64,
    /// Budget de pixels par frame webcam (plus petit = latence bornée).
    pub live_budget: u64,

    // === Export image ===
    /// Police monospace chargée une fois au démarrage.
    pub font_path: PathBuf,
    /// Largeur d'une cellule de caractère en pixels.
    pub cell_width: u32,
    /// Hauteur d'une cellule de caractère en pixels.
    pub cell_height: u32,
    /// Taille de la police en pixels.
    pub font_size: f32,

    // === Vidéo ===
    /// FPS cible de la décomposition (jamais de sur-échantillonnage).
    pub target_fps: u32,
    /// Dossier de travail des frames intermédiaires.
    pub work_dir: PathBuf,
    /// Préfixe des frames extraites (`<prefix><i>.png`).
    pub frame_prefix: String,
    /// Extension du conteneur vidéo de sortie.
    pub container: String,

    // === Live ===
    /// Périphérique de capture (dépend de la plateforme).
    pub device: String,
    /// Largeur de capture demandée à ffmpeg.
    pub capture_width: u32,
    /// Hauteur de capture demandée à ffmpeg.
    pub capture_height: u32,
    /// Pause entre deux frames live, en millisecondes.
    pub delay_ms: u64,
}

/// Périphérique de capture par défaut selon la plateforme.
#[must_use]
pub fn default_device() -> String {
    if cfg!(target_os = "macos") {
        "0".into()
    } else if cfg!(target_os = "windows") {
        "video=Integrated Camera".into()
    } else {
        "/dev/video0".into()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            charset: CHARSET_DEFAULT.to_string(),
            image_budget: 10_000,
            frame_budget: 10_000,
            live_budget: 15_000,
            font_path: PathBuf::from("FUTRFW.TTF"),
            cell_width: 20,
            cell_height: 20,
            font_size: 20.0,
            target_fps: 10,
            work_dir: PathBuf::from("data"),
            frame_prefix: "frame".into(),
            container: "mp4".into(),
            device: default_device(),
            capture_width: 640,
            capture_height: 480,
            delay_ms: 100,
        }
    }
}

impl AppConfig {
    /// Rampe construite depuis `charset`.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the charset is empty.
    pub fn ramp(&self) -> Result<GlyphRamp, CoreError> {
        GlyphRamp::new(&self.charset)
    }

    /// Vérifie les valeurs qui rendraient une conversion impossible.
    ///
    /// # Errors
    /// Returns `CoreError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.ramp()?;
        for (name, budget) in [
            ("image_budget", self.image_budget),
            ("frame_budget", self.frame_budget),
            ("live_budget", self.live_budget),
        ] {
            if budget == 0 {
                return Err(CoreError::Config(format!("{name} doit être > 0")));
            }
        }
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(CoreError::Config(format!(
                "cellule {}×{} invalide",
                self.cell_width, self.cell_height
            )));
        }
        if self.font_size.is_nan() || self.font_size <= 0.0 {
            return Err(CoreError::Config("font_size doit être > 0".into()));
        }
        if self.target_fps == 0 {
            return Err(CoreError::Config("target_fps doit être > 0".into()));
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(CoreError::Config(format!(
                "capture {}×{} invalide",
                self.capture_width, self.capture_height
            )));
        }
        if self.frame_prefix.is_empty() || self.container.is_empty() {
            return Err(CoreError::Config(
                "frame_prefix et container ne peuvent pas être vides".into(),
            ));
        }
        Ok(())
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    ramp: Option<RampSection>,
    sampling: Option<SamplingSection>,
    export: Option<ExportSection>,
    video: Option<VideoSection>,
    live: Option<LiveSection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RampSection {
    charset: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SamplingSection {
    image_budget: Option<u64>,
    frame_budget: Option<u64>,
    live_budget: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExportSection {
    font_path: Option<PathBuf>,
    cell_width: Option<u32>,
    cell_height: Option<u32>,
    font_size: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct VideoSection {
    target_fps: Option<u32>,
    work_dir: Option<PathBuf>,
    frame_prefix: Option<String>,
    container: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LiveSection {
    device: Option<String>,
    capture_width: Option<u32>,
    capture_height: Option<u32>,
    delay_ms: Option<u64>,
}

/// Parse une config TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or a value is invalid.
///
/// # Example
/// ```
/// use la_core::config::parse_config;
/// let config = parse_config("[video]\ntarget_fps = 5\n").unwrap();
/// assert_eq!(config.target_fps, 5);
/// assert_eq!(config.image_budget, 10_000);
/// ```
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AppConfig::default();

    if let Some(r) = file.ramp
        && let Some(v) = r.charset
    {
        config.charset = v;
    }
    if let Some(s) = file.sampling {
        if let Some(v) = s.image_budget {
            config.image_budget = v;
        }
        if let Some(v) = s.frame_budget {
            config.frame_budget = v;
        }
        if let Some(v) = s.live_budget {
            config.live_budget = v;
        }
    }
    if let Some(e) = file.export {
        if let Some(v) = e.font_path {
            config.font_path = v;
        }
        if let Some(v) = e.cell_width {
            config.cell_width = v;
        }
        if let Some(v) = e.cell_height {
            config.cell_height = v;
        }
        if let Some(v) = e.font_size {
            config.font_size = v;
        }
    }
    if let Some(v) = file.video {
        if let Some(x) = v.target_fps {
            config.target_fps = x;
        }
        if let Some(x) = v.work_dir {
            config.work_dir = x;
        }
        if let Some(x) = v.frame_prefix {
            config.frame_prefix = x;
        }
        if let Some(x) = v.container {
            config.container = x;
        }
    }
    if let Some(l) = file.live {
        if let Some(v) = l.device {
            config.device = v;
        }
        if let Some(v) = l.capture_width {
            config.capture_width = v;
        }
        if let Some(v) = l.capture_height {
            config.capture_height = v;
        }
        if let Some(v) = l.delay_ms {
            config.delay_ms = v;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use la_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.charset, CHARSET_DEFAULT);
        assert_eq!(config.cell_width, 20);
        assert_eq!(config.delay_ms, 100);
        // Les frames vidéo sont converties avec le même budget que les images.
        assert_eq!(config.frame_budget, 10_000);
        assert_eq!(config.frame_budget, config.image_budget);
    }

    #[test]
    fn partial_override() {
        let config = parse_config(
            "[ramp]\ncharset = \"@. \"\n[sampling]\nlive_budget = 4000\n[live]\ndelay_ms = 0\n",
        )
        .unwrap();
        assert_eq!(config.ramp().unwrap().len(), 3);
        assert_eq!(config.live_budget, 4000);
        assert_eq!(config.image_budget, 10_000);
        assert_eq!(config.delay_ms, 0);
    }

    #[test]
    fn zero_budget_rejected() {
        let err = parse_config("[sampling]\nimage_budget = 0\n").unwrap_err();
        assert!(
            err.downcast_ref::<CoreError>()
                .is_some_and(|e| matches!(e, CoreError::Config(_)))
        );
    }

    #[test]
    fn empty_charset_rejected() {
        assert!(parse_config("[ramp]\ncharset = \"\"\n").is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(parse_config("[video]\nfps = 3\n").is_err());
    }

    #[test]
    fn shipped_default_file_matches_defaults() {
        let config = parse_config(include_str!("../../../config/default.toml")).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.charset, defaults.charset);
        assert_eq!(config.frame_budget, defaults.frame_budget);
        assert_eq!(config.font_path, defaults.font_path);
        assert_eq!(config.device, defaults.device);
        assert_eq!(config.container, "mp4");
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[export]\ncell_width = 8\ncell_height = 16\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!((config.cell_width, config.cell_height), (8, 16));
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }
}
