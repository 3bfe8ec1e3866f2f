use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use la_core::config::AppConfig;
use la_core::frame::AsciiCanvas;
use la_core::traits::Source;
use la_export::Rasterizer;
use la_export::muxer::assemble_video;
use la_export::text::artifact_path;
use la_source::frame_dir::{FrameDirSource, frame_path};
use la_source::image::save_gray;
use la_source::video::VideoSource;
use rayon::prelude::*;

use crate::pipeline::Converter;

/// Fréquence des lignes de progression.
const PROGRESS_EVERY: usize = 50;

/// Résultat de la décomposition d'une vidéo en frames numérotées.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecomposedVideo {
    /// Frames écrites dans le dossier de travail.
    pub retained: usize,
    /// Débit natif du flux.
    pub native_fps: f64,
    /// Frames décodées au débit natif.
    pub native_frames: u64,
    /// Durée arrondie à la seconde, au moins 1.
    pub duration_secs: u64,
}

impl DecomposedVideo {
    /// Débit de réassemblage : frames retenues / durée.
    #[must_use]
    pub fn output_fps(&self) -> f64 {
        self.retained as f64 / self.duration_secs as f64
    }
}

/// `round(frames / fps)` secondes, jamais 0.
///
/// # Example
/// ```
/// use la_app::batch::duration_secs;
/// assert_eq!(duration_secs(300, 30.0), 10);
/// assert_eq!(duration_secs(5, 30.0), 1);
/// ```
#[must_use]
pub fn duration_secs(native_frames: u64, native_fps: f64) -> u64 {
    if native_fps <= 0.0 {
        return 1;
    }
    ((native_frames as f64 / native_fps).round() as u64).max(1)
}

/// Écrit chaque frame de la source en `<dir>/<prefix><i>.png`.
///
/// # Errors
/// Arrêt à la première frame illisible ou non écrite.
pub fn write_frames<S: Source + ?Sized>(source: &mut S, dir: &Path, prefix: &str) -> Result<usize> {
    let mut count = 0usize;
    while let Some(frame) = source.next_frame()? {
        save_gray(&frame, &frame_path(dir, prefix, count))?;
        count += 1;
        if count.is_multiple_of(PROGRESS_EVERY) {
            log::info!("Décomposition : {count} frames écrites");
        }
    }
    Ok(count)
}

/// Décode la vidéo, garde une frame sur N et l'écrit dans le dossier de travail.
///
/// # Errors
/// `ResourceMissing` / `DecodeFailure` si la vidéo est absente ou corrompue.
pub fn decompose_video(path: &Path, config: &AppConfig) -> Result<DecomposedVideo> {
    log::info!("Étape 1/3 : Décomposition de {}", path.display());
    let mut source = VideoSource::open(path, config.target_fps)?;
    let retained = write_frames(&mut source, &config.work_dir, &config.frame_prefix)?;
    let native_fps = source.info().fps;
    let native_frames = source.native_frame_count();
    let result = DecomposedVideo {
        retained,
        native_fps,
        native_frames,
        duration_secs: duration_secs(native_frames, native_fps),
    };
    log::info!(
        "{retained} frames retenues sur {native_frames} ({:.3}fps, {}s)",
        native_fps,
        result.duration_secs
    );
    Ok(result)
}

/// Convertit toutes les frames d'une source, dans l'ordre.
///
/// Les frames sont tirées séquentiellement par paquets puis converties en
/// parallèle ; l'ordre des canvas suit celui des frames.
///
/// # Errors
/// Première erreur de lecture ou de conversion.
pub fn convert_frames<S: Source + ?Sized>(
    source: &mut S,
    converter: &Converter,
    budget: u64,
) -> Result<Vec<AsciiCanvas>> {
    let chunk_len = rayon::current_num_threads().max(1) * 4;
    let mut canvases = Vec::new();
    let mut chunk = Vec::with_capacity(chunk_len);
    loop {
        chunk.clear();
        while chunk.len() < chunk_len {
            match source.next_frame()? {
                Some(frame) => chunk.push(frame),
                None => break,
            }
        }
        if chunk.is_empty() {
            break;
        }
        let converted = chunk
            .par_iter()
            .map(|frame| converter.convert_frame(frame, budget))
            .collect::<Result<Vec<_>>>()?;
        canvases.extend(converted);
        log::info!("Conversion : {} frames", canvases.len());
    }
    Ok(canvases)
}

/// Base (sans extension) de la frame rendue `index` : `<dir>/<fichier><index>`.
///
/// Seul le dernier composant de `name` est gardé : `--output out/clip` ou un
/// chemin absolu restent dans `dir`.
#[must_use]
pub fn rendered_frame_base(dir: &Path, name: &str, index: usize) -> PathBuf {
    let file = Path::new(name)
        .file_name()
        .map_or_else(|| "lumascii".into(), |f| f.to_string_lossy());
    dir.join(format!("{file}{index}"))
}

/// Rasterise chaque canvas en `<dir>/<name><i>.png`, dans l'ordre.
///
/// # Errors
/// Première erreur de rendu ou d'écriture.
pub fn export_frames(
    canvases: &[AsciiCanvas],
    rasterizer: &Rasterizer,
    dir: &Path,
    name: &str,
) -> Result<Vec<PathBuf>> {
    canvases
        .par_iter()
        .enumerate()
        .map(|(i, canvas)| rasterizer.export_png(canvas, &rendered_frame_base(dir, name, i)))
        .collect()
}

/// Bilan d'un traitement vidéo complet.
#[derive(Debug)]
pub struct BatchReport {
    pub decomposed: DecomposedVideo,
    pub frames: Vec<PathBuf>,
    /// `<name>.<ext>`, absent avec `--no-video`.
    pub video: Option<PathBuf>,
}

/// Décomposition, conversion, rendu des frames puis réassemblage optionnel.
///
/// # Errors
/// Toute erreur d'une étape interrompt le traitement.
pub fn run_video(
    path: &Path,
    config: &AppConfig,
    rasterizer: &Rasterizer,
    name: &str,
    reassemble: bool,
) -> Result<BatchReport> {
    let decomposed = decompose_video(path, config)?;

    log::info!("Étape 2/3 : Conversion ASCII (budget {})", config.frame_budget);
    let converter = Converter::new(config.ramp()?);
    let mut frames =
        FrameDirSource::new(&config.work_dir, &config.frame_prefix, decomposed.retained);
    let canvases = convert_frames(&mut frames, &converter, config.frame_budget)?;

    log::info!("Étape 3/3 : Rendu de {} frames", canvases.len());
    let paths = export_frames(&canvases, rasterizer, &config.work_dir, name)?;

    let video = if reassemble {
        let out = artifact_path(Path::new(name), &config.container);
        if let Some(parent) = out.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Création de {}", parent.display()))?;
        }
        let fps = decomposed.output_fps();
        assemble_video(&paths, fps, &out)
            .with_context(|| format!("Assemblage de {}", out.display()))?;
        Some(out)
    } else {
        None
    };
    Ok(BatchReport {
        decomposed,
        frames: paths,
        video,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use la_core::charset::GlyphRamp;
    use la_core::frame::GrayFrame;

    /// Source en mémoire : frame `i` remplie de la valeur `i * 20`.
    struct Counting {
        next: u8,
        total: u8,
        fail_at: Option<u8>,
    }

    impl Source for Counting {
        fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
            if self.next >= self.total {
                return Ok(None);
            }
            if self.fail_at == Some(self.next) {
                anyhow::bail!("frame {} illisible", self.next);
            }
            let v = self.next.saturating_mul(20);
            self.next += 1;
            Ok(Some(GrayFrame::from_raw(8, 4, vec![v; 32])?))
        }

        fn native_size(&self) -> (u32, u32) {
            (8, 4)
        }

        fn is_live(&self) -> bool {
            false
        }
    }

    fn counting(total: u8) -> Counting {
        Counting {
            next: 0,
            total,
            fail_at: None,
        }
    }

    #[test]
    fn conversion_keeps_index_order() {
        let conv = Converter::new(GlyphRamp::default());
        let lut = la_core::charset::LuminanceLut::new(&GlyphRamp::default());
        let canvases = convert_frames(&mut counting(13), &conv, 1_000).unwrap();
        assert_eq!(canvases.len(), 13);
        for (i, canvas) in canvases.iter().enumerate() {
            assert_eq!(canvas.get(0, 0), lut.map(i as u8 * 20));
        }
    }

    #[test]
    fn first_failure_aborts() {
        let conv = Converter::new(GlyphRamp::default());
        let mut src = Counting {
            fail_at: Some(3),
            ..counting(10)
        };
        assert!(convert_frames(&mut src, &conv, 1_000).is_err());
    }

    #[test]
    fn frames_written_with_zero_based_names() {
        let dir = tempfile::tempdir().unwrap();
        let n = write_frames(&mut counting(3), dir.path(), "frame").unwrap();
        assert_eq!(n, 3);
        assert!(dir.path().join("frame0.png").is_file());
        assert!(dir.path().join("frame2.png").is_file());
        assert!(!dir.path().join("frame3.png").exists());

        let mut back = FrameDirSource::scan(dir.path(), "frame");
        assert_eq!(back.len(), 3);
        let first = back.next_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height), (8, 4));
    }

    #[test]
    fn rendered_frames_stay_in_work_dir() {
        let dir = Path::new("data");
        assert_eq!(rendered_frame_base(dir, "clip", 0), Path::new("data/clip0"));
        assert_eq!(rendered_frame_base(dir, "out/clip", 3), Path::new("data/clip3"));
        assert_eq!(rendered_frame_base(dir, "/tmp/x/clip", 12), Path::new("data/clip12"));
        assert_eq!(rendered_frame_base(dir, "..", 1), Path::new("data/lumascii1"));
        assert!(rendered_frame_base(dir, "/abs/clip.v2", 1).starts_with(dir));
    }

    #[test]
    fn duration_rounding() {
        assert_eq!(duration_secs(299, 29.97), 10);
        assert_eq!(duration_secs(45, 30.0), 2);
        assert_eq!(duration_secs(0, 25.0), 1);
        assert_eq!(duration_secs(100, 0.0), 1);
    }

    #[test]
    fn output_fps_is_retained_over_duration() {
        let d = DecomposedVideo {
            retained: 100,
            native_fps: 30.0,
            native_frames: 300,
            duration_secs: 10,
        };
        assert!((d.output_fps() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_video_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            work_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        assert!(decompose_video(&dir.path().join("absent.mp4"), &config).is_err());
        assert!(!dir.path().join("frame0.png").exists());
    }
}
