use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use la_core::config::AppConfig;
use la_core::error::CoreError;
use la_export::Rasterizer;

use crate::cli::{Cli, SourceKind};

/// Ressources initialisées une fois au démarrage et passées explicitement.
pub struct Resources {
    work_dir: PathBuf,
    rasterizer: Rasterizer,
}

impl Resources {
    /// Vérifie et charge la police, puis crée le dossier de travail.
    ///
    /// # Errors
    /// `ResourceMissing` si la police est absente, erreur de parsing si elle
    /// est invalide, erreur I/O si le dossier ne peut pas être créé.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let rasterizer = load_rasterizer(config)?;
        std::fs::create_dir_all(&config.work_dir).with_context(|| {
            format!(
                "Impossible de créer le dossier de travail {}",
                config.work_dir.display()
            )
        })?;
        log::debug!("Dossier de travail : {}", config.work_dir.display());
        Ok(Self {
            work_dir: config.work_dir.clone(),
            rasterizer,
        })
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[must_use]
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }
}

/// Tout ce qu'il faut avant d'ouvrir une source.
pub struct Startup {
    pub source: SourceKind,
    pub config: AppConfig,
    pub resources: Resources,
}

/// Valide la source, résout la config et initialise les ressources.
///
/// Aucune source n'est ouverte ici : une police absente arrête le programme
/// avant toute lecture d'image, de vidéo ou de webcam.
///
/// # Errors
/// Source invalide, config invalide ou ressource manquante.
pub fn startup(cli: &Cli) -> Result<Startup> {
    let source = cli.validate_source()?;
    let mut config = resolve_config(cli)?;
    cli.apply_overrides(&mut config, &source);
    config.validate()?;
    let resources = Resources::init(&config)?;
    Ok(Startup {
        source,
        config,
        resources,
    })
}

/// Config : fichier s'il existe, défauts sinon.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        la_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AppConfig::default())
    }
}

fn load_rasterizer(config: &AppConfig) -> Result<Rasterizer> {
    let path = &config.font_path;
    if !path.is_file() {
        return Err(CoreError::ResourceMissing {
            path: path.display().to_string(),
        }
        .into());
    }
    let font_data =
        std::fs::read(path).with_context(|| format!("Lecture de la police {}", path.display()))?;
    let ramp = config.ramp()?;
    let rasterizer = Rasterizer::new(
        &font_data,
        config.font_size,
        config.cell_width,
        config.cell_height,
        ramp.glyphs(),
    )
    .with_context(|| format!("Police {}", path.display()))?;
    log::info!("Police chargée : {}", path.display());
    Ok(rasterizer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";

    #[test]
    fn missing_font_is_resource_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            font_path: dir.path().join("absent.ttf"),
            work_dir: dir.path().join("data"),
            ..AppConfig::default()
        };
        let err = Resources::init(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::ResourceMissing { .. })
        ));
        assert!(!config.work_dir.exists());
    }

    #[test]
    fn invalid_font_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("broken.ttf");
        std::fs::write(&font, b"garbage").unwrap();
        let config = AppConfig {
            font_path: font,
            work_dir: dir.path().join("data"),
            ..AppConfig::default()
        };
        assert!(Resources::init(&config).is_err());
    }

    #[test]
    fn work_dir_created() {
        if !Path::new(SYSTEM_FONT).is_file() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            font_path: SYSTEM_FONT.into(),
            work_dir: dir.path().join("nested/data"),
            ..AppConfig::default()
        };
        let res = Resources::init(&config).unwrap();
        assert!(res.work_dir().is_dir());
        assert_eq!(res.rasterizer().target_dimensions(2, 3), (40, 60));
    }

    #[test]
    fn missing_font_aborts_before_text_source() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("absent.ttf");
        let work = dir.path().join("data");
        let config = dir.path().join("lumascii.toml");
        std::fs::write(
            &config,
            format!(
                "[export]\nfont_path = {:?}\n\n[video]\nwork_dir = {:?}\n",
                font.display().to_string(),
                work.display().to_string()
            ),
        )
        .unwrap();
        // Terminal mode on an image that does not exist: the font is still
        // checked first and nothing is read from the source.
        let cli = Cli::try_parse_from([
            "lumascii",
            "--image",
            dir.path().join("absent.png").to_str().unwrap(),
            "--mode",
            "term",
            "--config",
            config.to_str().unwrap(),
        ])
        .unwrap();
        let err = startup(&cli).err().unwrap();
        match err.downcast_ref::<CoreError>() {
            Some(CoreError::ResourceMissing { path }) => {
                assert_eq!(path, &font.display().to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!work.exists());
    }
}
