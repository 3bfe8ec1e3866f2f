/// Orchestration de lumascii : conversion d'image, traitement vidéo par lots,
/// boucle webcam temps réel.

pub mod batch;
pub mod cli;
pub mod live;
pub mod pipeline;
pub mod resources;
