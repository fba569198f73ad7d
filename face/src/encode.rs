use image::RgbImage;

use crate::FaceError;

/// Extracts a fixed-length embedding from a face crop.
///
/// The recognition model is a black-box capability supplied by the host.
/// Implementations must L2-normalize their output so Euclidean distances
/// are comparable across encoders, and must be safe for concurrent use.
pub trait FaceEncoder: Send + Sync {
    /// Computes an embedding from a cropped face image.
    fn encode(&self, face: &RgbImage) -> Result<Vec<f32>, FaceError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 512).
    fn dimension(&self) -> usize;
}
