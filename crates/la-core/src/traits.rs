use anyhow::Result;

use crate::frame::GrayFrame;

/// Fournit des frames en niveaux de gris au pipeline.
///
/// Implémenté par : `ImageSource`, `FrameDirSource`, `VideoSource`, `WebcamSource`.
/// Le batcher et la boucle live ne dépendent que de ce trait.
///
/// # Example
/// ```
/// use la_core::traits::Source;
/// use la_core::frame::GrayFrame;
///
/// struct OneShot(Option<GrayFrame>);
/// impl Source for OneShot {
///     fn next_frame(&mut self) -> anyhow::Result<Option<GrayFrame>> { Ok(self.0.take()) }
///     fn native_size(&self) -> (u32, u32) { (1, 1) }
///     fn is_live(&self) -> bool { false }
/// }
///
/// let mut src = OneShot(Some(GrayFrame::new(1, 1)));
/// assert!(src.next_frame().unwrap().is_some());
/// assert!(src.next_frame().unwrap().is_none());
/// ```
pub trait Source {
    /// Retourne la prochaine frame.
    ///
    /// `Ok(None)` = source épuisée (fin de vidéo, image déjà livrée).
    ///
    /// # Errors
    /// Décodage ou capture impossible. Jamais réessayé par l'appelant.
    fn next_frame(&mut self) -> Result<Option<GrayFrame>>;

    /// Dimensions natives de la source (avant réduction).
    fn native_size(&self) -> (u32, u32);

    /// Indique si la source est infinie (webcam) ou finie (fichier).
    fn is_live(&self) -> bool;

    /// Le périphérique est-il prêt à produire une frame ?
    fn is_ready(&self) -> bool {
        true
    }
}
