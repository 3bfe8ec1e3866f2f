use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use la_core::frame::AsciiCanvas;
use la_core::traits::Source;

use crate::pipeline::Converter;

/// État courant de la boucle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Capturing,
    Converting,
    Displaying,
    Stopped,
}

/// Cause de l'arrêt de la boucle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C : terminaison normale.
    Interrupted,
    /// Périphérique absent ou frame illisible.
    CaptureFailed(String),
    /// Limite posée par [`LiveLoop::with_max_frames`].
    FrameLimit,
}

/// Boucle capture → conversion → affichage, cadencée par `delay`.
///
/// Le drapeau `stop` est lu en tête de chaque itération.
pub struct LiveLoop<S, W> {
    source: S,
    converter: Converter,
    out: W,
    budget: u64,
    delay: Duration,
    stop: Arc<AtomicBool>,
    max_frames: Option<u64>,
    state: LiveState,
    frames: u64,
}

impl<S: Source, W: Write> LiveLoop<S, W> {
    #[must_use]
    pub fn new(
        source: S,
        converter: Converter,
        out: W,
        budget: u64,
        delay: Duration,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            converter,
            out,
            budget,
            delay,
            stop,
            max_frames: None,
            state: LiveState::Idle,
            frames: 0,
        }
    }

    /// Arrêt après `n` frames affichées. Réservé aux tests et benchmarks.
    #[must_use]
    pub fn with_max_frames(mut self, n: u64) -> Self {
        self.max_frames = Some(n);
        self
    }

    #[must_use]
    pub fn state(&self) -> LiveState {
        self.state
    }

    /// Frames affichées depuis le démarrage.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Consomme la boucle et rend le flux de sortie.
    pub fn into_output(self) -> W {
        self.out
    }

    fn transition(&mut self, next: LiveState) {
        log::trace!("LiveLoop: {:?} → {next:?}", self.state);
        self.state = next;
    }

    fn stop_with(&mut self, reason: StopReason) -> StopReason {
        self.transition(LiveState::Stopped);
        log::info!("LiveLoop arrêtée après {} frames : {reason:?}", self.frames);
        reason
    }

    /// Tourne jusqu'à l'interruption ou l'échec de capture.
    ///
    /// # Errors
    /// Erreur de conversion ou d'écriture sur le terminal. Un échec de capture
    /// n'est pas une erreur : il est rendu comme [`StopReason::CaptureFailed`].
    pub fn run(&mut self) -> Result<StopReason> {
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(self.stop_with(StopReason::Interrupted));
            }
            if self.max_frames.is_some_and(|max| self.frames >= max) {
                return Ok(self.stop_with(StopReason::FrameLimit));
            }

            self.transition(LiveState::Capturing);
            if !self.source.is_ready() {
                return Ok(self.stop_with(StopReason::CaptureFailed(
                    "périphérique non prêt".into(),
                )));
            }
            let read = match self.source.next_frame() {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => Err("flux de capture terminé".to_string()),
                Err(e) => Err(format!("{e:#}")),
            };
            let frame = match read {
                Ok(frame) => frame,
                // Ctrl+C pendant une lecture bloquée : arrêt demandé.
                Err(_) if self.stop.load(Ordering::SeqCst) => {
                    return Ok(self.stop_with(StopReason::Interrupted));
                }
                Err(msg) => return Ok(self.stop_with(StopReason::CaptureFailed(msg))),
            };

            self.transition(LiveState::Converting);
            let canvas = self.converter.convert_frame(&frame, self.budget)?;

            self.transition(LiveState::Displaying);
            draw(&mut self.out, &canvas)?;
            self.frames += 1;

            self.transition(LiveState::Idle);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
    }
}

/// Remplace l'écran par le canvas : curseur en haut à gauche, effacement, texte.
///
/// # Errors
/// Erreur I/O du flux de sortie.
pub fn draw<W: Write>(out: &mut W, canvas: &AsciiCanvas) -> Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    write!(out, "{canvas}")?;
    out.flush()?;
    Ok(())
}
