use anyhow::{Context, Result};
use image::GrayImage;
use la_core::error::CoreError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Encode des frames `gray` brutes dans un conteneur vidéo avec ffmpeg.
///
/// libx264 exige des dimensions paires : un filtre `pad` complète d'une
/// colonne/ligne blanche si besoin.
pub struct VideoMuxer {
    ffmpeg_child: Child,
    width: u32,
    height: u32,
}

impl VideoMuxer {
    /// Lance ffmpeg, prêt à recevoir des frames `width × height` sur stdin.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg n'est pas installé ou impossible à démarrer.
    pub fn new(output_path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height }.into());
        }
        let path_str = output_path.to_str().context("Chemin de sortie non UTF-8")?;

        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-vcodec",
                "rawvideo",
                "-s",
                &format!("{width}x{height}"),
                "-pix_fmt",
                "gray",
                "-r",
                &format!("{fps:.6}"),
                "-i",
                "-",
                "-vf",
                "pad=ceil(iw/2)*2:ceil(ih/2)*2:0:0:white",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-hide_banner",
                "-loglevel",
                "error",
                path_str,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context(
                "Échec de l'initialisation de l'encodeur vidéo ffmpeg. (Est-il dans PATH ?)",
            )?;

        log::info!(
            "VideoMuxer: {} {}x{} @ {:.3}fps",
            output_path.display(),
            width,
            height,
            fps
        );
        Ok(Self {
            ffmpeg_child: child,
            width,
            height,
        })
    }

    /// Ajoute une frame au flux.
    ///
    /// # Errors
    /// `InvalidDimensions` si la frame n'a pas la taille du flux, erreur I/O
    /// si l'écriture dans le pipe échoue.
    pub fn write_frame(&mut self, frame: &GrayImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(CoreError::InvalidDimensions {
                width: frame.width(),
                height: frame.height(),
            }
            .into());
        }
        if let Some(stdin) = self.ffmpeg_child.stdin.as_mut() {
            stdin
                .write_all(frame.as_raw())
                .context("ffmpeg a fermé son entrée")?;
        }
        Ok(())
    }

    /// Ferme le flux et finalise le fichier.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg signale une erreur de terminaison.
    pub fn finish(mut self) -> Result<()> {
        drop(self.ffmpeg_child.stdin.take());

        let output = self.ffmpeg_child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg encoder error: {stderr}");
        }
        Ok(())
    }
}

/// Vérifie que toutes les images ont la taille de la première.
///
/// # Errors
/// `DimensionMismatch` sur la première image divergente, erreur de lecture
/// si un en-tête est illisible.
pub fn check_dimensions(frames: &[PathBuf]) -> Result<(u32, u32)> {
    let first = frames.first().context("Aucune image à assembler")?;
    let expected = ::image::image_dimensions(first)
        .with_context(|| format!("Lecture de {}", first.display()))?;
    for (index, path) in frames.iter().enumerate().skip(1) {
        let found = ::image::image_dimensions(path)
            .with_context(|| format!("Lecture de {}", path.display()))?;
        if found != expected {
            return Err(CoreError::DimensionMismatch {
                index,
                expected,
                found,
            }
            .into());
        }
    }
    Ok(expected)
}

/// Assemble une séquence d'images en vidéo à `fps` images/seconde, dans l'ordre.
///
/// # Errors
/// `DimensionMismatch` avant tout lancement d'ffmpeg si les tailles divergent,
/// sinon toute erreur de lecture ou d'encodage.
pub fn assemble_video(frames: &[PathBuf], fps: f64, output: &Path) -> Result<()> {
    let (width, height) = check_dimensions(frames)?;
    let mut muxer = VideoMuxer::new(output, width, height, fps)?;
    for path in frames {
        let img = ::image::open(path)
            .with_context(|| format!("Lecture de {}", path.display()))?
            .to_luma8();
        muxer.write_frame(&img)?;
    }
    muxer.finish()?;
    log::info!("Vidéo assemblée : {} ({} images)", output.display(), frames.len());
    Ok(())
}
