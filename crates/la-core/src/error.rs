use thiserror::Error;

/// Errors originating from the conversion pipeline.
///
/// Functions across the workspace return `anyhow::Result` and wrap these
/// values, so callers can recover the variant with `downcast_ref`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Required resource (font, source file) does not exist.
    #[error("Ressource introuvable : {path}")]
    ResourceMissing {
        /// Path that was not found.
        path: String,
    },

    /// Source image or video frame cannot be decoded.
    #[error("Décodage impossible de {path} : {reason}")]
    DecodeFailure {
        /// Image path or frame label.
        path: String,
        /// Underlying decoder message.
        reason: String,
    },

    /// Live capture device unavailable or unreadable.
    #[error("Capture impossible : {0}")]
    CaptureFailure(String),

    /// Frames destined for video re-assembly do not share pixel dimensions.
    #[error(
        "Dimensions incohérentes pour la frame {index} : attendu {}×{}, obtenu {}×{}",
        .expected.0, .expected.1, .found.0, .found.1
    )]
    DimensionMismatch {
        /// Index of the offending frame.
        index: usize,
        /// Dimensions of frame 0.
        expected: (u32, u32),
        /// Dimensions of the offending frame.
        found: (u32, u32),
    },

    /// Unrecognized export mode string.
    #[error("Mode d'export inconnu : {0} (attendu : txt, img, term)")]
    InvalidExportMode(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },
}
