// Capture webcam via ffmpeg en subprocess, comme le décodage vidéo.
// Entrée selon la plateforme : v4l2 (Linux), avfoundation (macOS), dshow (Windows).
// ffmpeg met l'image à l'échelle `width × height` et écrit du `gray` brut.
// Un thread lit le pipe en continu ; le consommateur ne voit que la frame la
// plus récente, les frames non lues sont écrasées.

use anyhow::{Context, Result};
use flume::Receiver;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use la_core::error::CoreError;
use la_core::frame::GrayFrame;
use la_core::traits::Source;

use crate::video::read_exact_or_eof;

/// Paramètres d'ouverture du périphérique de capture.
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    /// Nom ou chemin du périphérique (`/dev/video0`, `0`, `video=...`).
    pub device: String,
    /// Largeur des frames livrées.
    pub width: u32,
    /// Hauteur des frames livrées.
    pub height: u32,
    /// Débit demandé à ffmpeg en sortie.
    pub fps: u32,
}

/// Format d'entrée ffmpeg de la plateforme courante.
#[must_use]
pub fn input_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

/// Arguments ffmpeg pour une capture `gray` brute sur stdout.
fn capture_args(settings: &CaptureSettings) -> Vec<String> {
    vec![
        "-f".into(),
        input_format().into(),
        "-i".into(),
        settings.device.clone(),
        "-vf".into(),
        format!("scale={}:{}", settings.width, settings.height),
        "-r".into(),
        settings.fps.max(1).to_string(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "gray".into(),
        "-an".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "pipe:1".into(),
    ]
}

/// Dernière frame lue par un thread dédié.
///
/// Canal de capacité 1 : avant chaque envoi, le thread retire la frame que le
/// consommateur n'a pas encore prise. Un consommateur lent reçoit donc
/// toujours l'image la plus récente, jamais un arriéré.
pub struct LatestFrame {
    rx: Receiver<Vec<u8>>,
    handle: Option<thread::JoinHandle<String>>,
}

impl LatestFrame {
    /// Lance la lecture de frames de `frame_len` bytes depuis `reader`.
    ///
    /// # Errors
    /// Erreur si le thread ne peut pas être créé.
    pub fn spawn<R: Read + Send + 'static>(reader: R, frame_len: usize) -> Result<Self> {
        let (tx, rx) = flume::bounded(1);
        let drain = rx.clone();
        let handle = thread::Builder::new()
            .name("la-webcam".to_string())
            .spawn(move || {
                let mut reader = reader;
                loop {
                    let mut buf = vec![0u8; frame_len];
                    match read_exact_or_eof(&mut reader, &mut buf) {
                        Ok(true) => {}
                        Ok(false) => return "flux de capture interrompu".to_string(),
                        Err(e) => return format!("lecture impossible : {e}"),
                    }
                    // `drain` compte parmi les récepteurs : seul, le consommateur est parti.
                    if tx.receiver_count() < 2 {
                        return "périphérique fermé".to_string();
                    }
                    if drain.try_recv().is_ok() {
                        log::trace!("LatestFrame: frame non lue remplacée");
                    }
                    // Seul producteur, canal vidé : l'envoi ne bloque pas.
                    if tx.send(buf).is_err() {
                        return "périphérique fermé".to_string();
                    }
                }
            })
            .context("Impossible de lancer le thread de capture")?;
        Ok(Self {
            rx,
            handle: Some(handle),
        })
    }

    /// Attend la frame la plus récente.
    ///
    /// # Errors
    /// `CaptureFailure` quand le flux est terminé et qu'aucune frame ne reste.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        if let Ok(buf) = self.rx.recv() {
            return Ok(buf);
        }
        let reason = self
            .handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_else(|| "périphérique fermé".to_string());
        Err(CoreError::CaptureFailure(reason).into())
    }
}

/// Source webcam : la frame la plus récente à chaque appel, tant que le
/// périphérique répond.
pub struct WebcamSource {
    child: Option<Child>,
    frames: Option<LatestFrame>,
    settings: CaptureSettings,
}

impl WebcamSource {
    /// Ouvre le périphérique.
    ///
    /// # Errors
    /// `CaptureFailure` si le périphérique est absent (Linux) ou si ffmpeg ne
    /// peut pas être lancé.
    pub fn open(settings: CaptureSettings) -> Result<Self> {
        if cfg!(target_os = "linux") && !Path::new(&settings.device).exists() {
            return Err(CoreError::CaptureFailure(format!(
                "périphérique {} introuvable",
                settings.device
            ))
            .into());
        }
        let mut child = Command::new("ffmpeg")
            .args(capture_args(&settings))
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CoreError::CaptureFailure(format!("impossible de lancer ffmpeg : {e}")))?;
        let stdout = child
            .stdout
            .take()
            .context("ffmpeg sans stdout (pipe non configuré)")?;
        let frames =
            LatestFrame::spawn(stdout, settings.width as usize * settings.height as usize)?;
        log::info!(
            "WebcamSource: {} ({}) {}x{} @ {}fps",
            settings.device,
            input_format(),
            settings.width,
            settings.height,
            settings.fps
        );
        Ok(Self {
            child: Some(child),
            frames: Some(frames),
            settings,
        })
    }

    /// Tue ffmpeg d'abord : le pipe se ferme et le thread de lecture sort.
    fn shutdown(&mut self) {
        if let Some(mut c) = self.child.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
        if let Some(mut frames) = self.frames.take()
            && let Some(handle) = frames.handle.take()
        {
            drop(frames);
            let _ = handle.join();
        }
    }
}

impl Source for WebcamSource {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        let Some(frames) = self.frames.as_mut() else {
            return Err(CoreError::CaptureFailure("périphérique fermé".into()).into());
        };
        match frames.recv() {
            Ok(data) => Ok(Some(GrayFrame::from_raw(
                self.settings.width,
                self.settings.height,
                data,
            )?)),
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn native_size(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }

    fn is_live(&self) -> bool {
        true
    }

    fn is_ready(&self) -> bool {
        self.frames.is_some()
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(device: &str) -> CaptureSettings {
        CaptureSettings {
            device: device.into(),
            width: 160,
            height: 120,
            fps: 10,
        }
    }

    #[test]
    fn args_scale_to_requested_size() {
        let args = capture_args(&settings("/dev/video3"));
        assert!(args.contains(&"scale=160:120".to_string()));
        assert!(args.contains(&"/dev/video3".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    fn wait_for_reader(frames: &LatestFrame) {
        let handle = frames.handle.as_ref().unwrap();
        while !handle.is_finished() {
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn slow_consumer_gets_newest_frame() {
        let stream: Vec<u8> = (1..=5u8).flat_map(|v| [v; 4]).collect();
        let mut frames = LatestFrame::spawn(std::io::Cursor::new(stream), 4).unwrap();
        wait_for_reader(&frames);
        assert_eq!(frames.recv().unwrap(), [5; 4]);
        let err = frames.recv().unwrap_err();
        match err.downcast_ref::<CoreError>() {
            Some(CoreError::CaptureFailure(msg)) => assert!(msg.contains("interrompu")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn truncated_frame_is_dropped() {
        let mut stream = vec![7u8; 4];
        stream.extend_from_slice(&[9, 9]);
        let mut frames = LatestFrame::spawn(std::io::Cursor::new(stream), 4).unwrap();
        wait_for_reader(&frames);
        assert_eq!(frames.recv().unwrap(), [7; 4]);
        assert!(frames.recv().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn missing_device_is_capture_failure() {
        let err = WebcamSource::open(settings("/dev/video-does-not-exist")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::CaptureFailure(_))
        ));
    }
}
