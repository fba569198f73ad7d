//! Face verification building blocks: image decode, detection and
//! embedding contracts, crop augmentation, and distance comparison.
//!
//! # Pipeline
//!
//! 1. [`decode_image`]: upload bytes -> RGB raster
//! 2. [`FaceDetector::detect`] + [`most_prominent`]: image -> face crop
//! 3. [`FaceEncoder::encode`]: crop -> fixed-length embedding
//! 4. [`euclidean_distance`]: live embedding vs stored embedding
//!
//! Detection and recognition models are black-box capabilities behind the
//! two traits; this crate fixes their I/O contracts and owns everything
//! around them. Note the comparison polarity: face scores are distances
//! (lower = more similar), the opposite of the voice log-likelihood ratio.

mod augment;
mod detect;
mod distance;
mod encode;
mod error;

pub use augment::{augment, AugmentKind};
pub use detect::{classify, crop_face, most_prominent, BoundingBox, Detection, FaceDetector};
pub use distance::euclidean_distance;
pub use encode::FaceEncoder;
pub use error::FaceError;

use image::RgbImage;

/// Upload ceiling for raw image payloads (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Decodes uploaded bytes in any common raster format and normalizes to
/// RGB8. Oversized payloads are rejected before decoding.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, FaceError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(FaceError::TooLarge {
            limit: MAX_IMAGE_BYTES,
            got: bytes.len(),
        });
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(FaceError::BadImage(_))
        ));
    }

    #[test]
    fn decode_rejects_oversized() {
        let huge = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            decode_image(&huge),
            Err(FaceError::TooLarge { .. })
        ));
    }

    #[test]
    fn decode_png_roundtrip() {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(3, 3).0, [10, 20, 30]);
    }
}
