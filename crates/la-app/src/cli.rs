use std::path::{Path, PathBuf};

use clap::Parser;
use la_core::config::AppConfig;
use la_export::ExportMode;

/// lumascii : convertit images, vidéos et webcam en art ASCII.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source : chemin vers une image (PNG, JPEG, BMP, GIF).
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Source : chemin vers une vidéo (décodée par ffmpeg).
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Utiliser la webcam comme source (boucle temps réel, Ctrl+C pour arrêter).
    #[arg(long, default_value_t = false)]
    pub webcam: bool,

    /// Mode d'export d'une image : txt, img, term. Défaut : term.
    #[arg(long)]
    pub mode: Option<String>,

    /// Nom de base des fichiers produits (sans extension).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Budget de pixels (remplace celui de la configuration pour la source choisie).
    #[arg(long)]
    pub budget: Option<u64>,

    /// FPS cible de la décomposition vidéo.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Vidéo : exporter les frames sans les réassembler.
    #[arg(long, default_value_t = false)]
    pub no_video: bool,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Source choisie sur la ligne de commande.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Image(PathBuf),
    Video(PathBuf),
    Webcam,
}

impl Cli {
    /// Validate that exactly one source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one source is specified.
    pub fn validate_source(&self) -> anyhow::Result<SourceKind> {
        let count = usize::from(self.image.is_some())
            + usize::from(self.video.is_some())
            + usize::from(self.webcam);

        if count == 0 {
            anyhow::bail!("Aucune source spécifiée. Utilisez --image, --video ou --webcam.");
        }
        if count > 1 {
            anyhow::bail!("Une seule source à la fois. Spécifiez --image, --video OU --webcam.");
        }
        Ok(match (&self.image, &self.video) {
            (Some(p), _) => SourceKind::Image(p.clone()),
            (_, Some(p)) => SourceKind::Video(p.clone()),
            _ => SourceKind::Webcam,
        })
    }

    /// Mode d'export d'une image ; `term` si absent.
    ///
    /// # Errors
    /// `InvalidExportMode` pour une chaîne inconnue.
    pub fn export_mode(&self) -> anyhow::Result<ExportMode> {
        match self.mode.as_deref() {
            None => Ok(ExportMode::Terminal),
            Some(s) => Ok(s.parse()?),
        }
    }

    /// Nom de base des sorties : `--output`, sinon `<stem>_ascii`.
    #[must_use]
    pub fn output_base(&self, source: &SourceKind) -> String {
        if let Some(name) = &self.output {
            return name.clone();
        }
        let stem = |p: &Path| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map_or_else(|| "lumascii".to_string(), |s| format!("{s}_ascii"))
        };
        match source {
            SourceKind::Image(p) | SourceKind::Video(p) => stem(p),
            SourceKind::Webcam => "webcam_ascii".to_string(),
        }
    }

    /// Applique les overrides CLI sur la configuration chargée.
    pub fn apply_overrides(&self, config: &mut AppConfig, source: &SourceKind) {
        if let Some(budget) = self.budget {
            match source {
                SourceKind::Image(_) => config.image_budget = budget,
                SourceKind::Video(_) => config.frame_budget = budget,
                SourceKind::Webcam => config.live_budget = budget,
            }
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
    }
}
