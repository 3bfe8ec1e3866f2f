// Décodage vidéo via ffmpeg en subprocess (std::process::Command).
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`        : interroge ffprobe pour obtenir width/height/fps
//   - `spawn_ffmpeg_pipe`  : lance ffmpeg → flux raw `gray` sur stdout
//   - `DecimatingReader`   : découpe le flux en frames, garde 1 frame sur N
//   - `VideoSource`        : `Source` au-dessus du pipe

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use la_core::error::CoreError;
use la_core::frame::GrayFrame;
use la_core::traits::Source;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde natives (ex: 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
}

/// Parse un débit ffprobe `"30000/1001"` ou `"25"`.
///
/// # Example
/// ```
/// use la_source::video::parse_frame_rate;
/// assert_eq!(parse_frame_rate("30/1"), Some(30.0));
/// assert!(parse_frame_rate("0/0").is_none());
/// ```
#[must_use]
pub fn parse_frame_rate(val: &str) -> Option<f64> {
    let mut parts = val.trim().splitn(2, '/');
    let num: f64 = parts.next()?.trim().parse().ok()?;
    let den: f64 = match parts.next() {
        Some(d) => d.trim().parse().ok()?,
        None => 1.0,
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Parse la sortie `key=value` de ffprobe.
fn parse_probe_output(text: &str) -> Option<VideoInfo> {
    let mut width = None;
    let mut height = None;
    let mut fps = None;
    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            fps = parse_frame_rate(val);
        }
    }
    match (width, height, fps) {
        (Some(w), Some(h), Some(fps)) if w > 0 && h > 0 => Some(VideoInfo {
            width: w,
            height: h,
            fps,
        }),
        _ => None,
    }
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// `ResourceMissing` si le fichier n'existe pas ; erreur si `ffprobe` est
/// introuvable ; `DecodeFailure` si aucun flux vidéo n'est décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !path.is_file() {
        return Err(CoreError::ResourceMissing {
            path: path.display().to_string(),
        }
        .into());
    }
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let text = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&text).ok_or_else(|| CoreError::DecodeFailure {
        path: path.display().to_string(),
        reason: "aucun flux vidéo trouvé par ffprobe".into(),
    })?;

    log::info!(
        "probe_video: {}x{} @ {:.3}fps ({})",
        info.width,
        info.height,
        info.fps,
        path.display()
    );
    Ok(info)
}

/// Lance un processus `ffmpeg` qui écrit des frames `gray` brutes sur stdout.
///
/// Chaque frame = `width × height` bytes, au débit natif du fichier.
/// `-an` supprime l'audio.
///
/// # Errors
/// Retourne une erreur si ffmpeg ne peut pas être lancé.
pub fn spawn_ffmpeg_pipe(path: &Path) -> Result<Child> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;
    let child = Command::new("ffmpeg")
        .args([
            "-i",
            path_str,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "gray",
            "-an",
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Impossible de lancer ffmpeg. Vérifiez qu'il est installé et dans le PATH.")?;
    log::debug!("ffmpeg spawné pour {}", path.display());
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false), // EOF
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Intervalle de décimation : `floor(native / target)`, minimum 1.
///
/// Jamais de sur-échantillonnage : une cible supérieure au débit natif garde
/// toutes les frames.
///
/// # Example
/// ```
/// use la_source::video::decimation_interval;
/// assert_eq!(decimation_interval(30.0, 10), 3);
/// assert_eq!(decimation_interval(29.97, 10), 2);
/// assert_eq!(decimation_interval(24.0, 60), 1);
/// ```
#[must_use]
pub fn decimation_interval(native_fps: f64, target_fps: u32) -> u64 {
    let target = f64::from(target_fps.max(1));
    if native_fps > target {
        ((native_fps / target).floor() as u64).max(1)
    } else {
        1
    }
}

/// Découpe un flux raw `gray` en frames et ne garde que les indices
/// multiples de `interval`.
pub struct DecimatingReader<R> {
    reader: R,
    width: u32,
    height: u32,
    interval: u64,
    /// Frames natives lues (gardées ou non).
    decoded: u64,
    buf: Vec<u8>,
}

impl<R: Read> DecimatingReader<R> {
    #[must_use]
    pub fn new(reader: R, width: u32, height: u32, interval: u64) -> Self {
        Self {
            reader,
            width,
            height,
            interval: interval.max(1),
            decoded: 0,
            buf: vec![0u8; width as usize * height as usize],
        }
    }

    /// Prochaine frame retenue, `None` en fin de flux.
    ///
    /// Une frame tronquée en fin de flux est ignorée.
    ///
    /// # Errors
    /// Erreur I/O du pipe.
    pub fn next_kept(&mut self) -> Result<Option<GrayFrame>> {
        loop {
            if !read_exact_or_eof(&mut self.reader, &mut self.buf)? {
                return Ok(None);
            }
            let index = self.decoded;
            self.decoded += 1;
            if index % self.interval == 0 {
                let frame = GrayFrame::from_raw(self.width, self.height, self.buf.clone())?;
                return Ok(Some(frame));
            }
        }
    }

    /// Nombre de frames natives lues jusqu'ici.
    #[must_use]
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

/// Source vidéo décimée : ffmpeg décode au débit natif, une frame sur N est
/// livrée.
pub struct VideoSource {
    child: Child,
    reader: DecimatingReader<ChildStdout>,
    info: VideoInfo,
    label: String,
    finished: bool,
}

impl VideoSource {
    /// Probe + spawn ffmpeg.
    ///
    /// # Errors
    /// Returns an error if the file is missing, not a video, or ffmpeg fails.
    pub fn open(path: &Path, target_fps: u32) -> Result<Self> {
        let info = probe_video(path)?;
        let mut child = spawn_ffmpeg_pipe(path)?;
        let stdout = child
            .stdout
            .take()
            .context("ffmpeg sans stdout (pipe non configuré)")?;
        let interval = decimation_interval(info.fps, target_fps);
        log::info!(
            "VideoSource: 1 frame sur {interval} ({:.3}fps → {target_fps}fps cible)",
            info.fps
        );
        Ok(Self {
            child,
            reader: DecimatingReader::new(stdout, info.width, info.height, interval),
            info,
            label: path.display().to_string(),
            finished: false,
        })
    }

    /// Métadonnées du flux.
    #[must_use]
    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Frames natives décodées jusqu'ici (total exact une fois la source épuisée).
    #[must_use]
    pub fn native_frame_count(&self) -> u64 {
        self.reader.decoded()
    }
}

impl Source for VideoSource {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        if self.finished {
            return Ok(None);
        }
        if let Some(frame) = self.reader.next_kept()? {
            return Ok(Some(frame));
        }
        // EOF : ffmpeg doit s'être terminé proprement, sinon le flux est corrompu.
        self.finished = true;
        let status = self.child.wait().context("Attente de ffmpeg")?;
        if !status.success() || self.reader.decoded() == 0 {
            return Err(CoreError::DecodeFailure {
                path: self.label.clone(),
                reason: format!(
                    "ffmpeg {status} après {} frame(s) décodée(s)",
                    self.reader.decoded()
                ),
            }
            .into());
        }
        log::info!(
            "VideoSource: EOF après {} frames natives ({})",
            self.reader.decoded(),
            self.label
        );
        Ok(None)
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn is_live(&self) -> bool {
        false
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
