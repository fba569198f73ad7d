use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::FaceError;

/// A detected face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl BoundingBox {
    /// Box area in pixels. Degenerate boxes report zero.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Detects face bounding boxes in an RGB image.
///
/// The detector itself (model weights, inference runtime) is a black-box
/// capability supplied by the host; this crate only fixes the I/O
/// contract.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait FaceDetector: Send + Sync {
    /// Returns every detected face, unordered.
    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, FaceError>;
}

/// How many faces a frame contains. `Multiple` is an ordinary outcome, not
/// an extraction failure: the proctoring path uses it to flag suspicious
/// frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No face found.
    None,
    /// Exactly one face.
    One(BoundingBox),
    /// Two or more faces; boxes sorted by descending area.
    Multiple(Vec<BoundingBox>),
}

/// Classifies a detector's output into a [`Detection`].
pub fn classify(mut boxes: Vec<BoundingBox>) -> Detection {
    match boxes.len() {
        0 => Detection::None,
        1 => Detection::One(boxes[0]),
        _ => {
            boxes.sort_by(|a, b| b.area().total_cmp(&a.area()));
            Detection::Multiple(boxes)
        }
    }
}

/// Picks the most prominent (largest-area) box, or `NoFaceDetected`.
///
/// Enrollment and login verification use this selection; a frame with
/// several faces still verifies against the dominant one, while the
/// proctoring check surfaces the multiplicity separately.
pub fn most_prominent(boxes: &[BoundingBox]) -> Result<BoundingBox, FaceError> {
    boxes
        .iter()
        .copied()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
        .ok_or(FaceError::NoFaceDetected)
}

/// Crops the image to a bounding box, clamped to the image bounds.
pub fn crop_face(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let (w, h) = image.dimensions();
    let left = (bbox.x1.max(0.0) as u32).min(w.saturating_sub(1));
    let top = (bbox.y1.max(0.0) as u32).min(h.saturating_sub(1));
    let right = (bbox.x2.max(0.0) as u32).clamp(left + 1, w);
    let bottom = (bbox.y2.max(0.0) as u32).clamp(top + 1, h);
    image::imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
        }
    }

    #[test]
    fn classify_counts() {
        assert_eq!(classify(vec![]), Detection::None);
        assert!(matches!(classify(vec![bx(0.0, 0.0, 10.0, 10.0)]), Detection::One(_)));
        match classify(vec![bx(0.0, 0.0, 5.0, 5.0), bx(0.0, 0.0, 20.0, 20.0)]) {
            Detection::Multiple(boxes) => {
                // Sorted by descending area.
                assert_eq!(boxes[0].x2, 20.0);
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn most_prominent_picks_largest() {
        let boxes = vec![bx(0.0, 0.0, 4.0, 4.0), bx(10.0, 10.0, 40.0, 40.0)];
        let best = most_prominent(&boxes).unwrap();
        assert_eq!(best.x1, 10.0);
    }

    #[test]
    fn most_prominent_empty_is_no_face() {
        assert!(matches!(
            most_prominent(&[]),
            Err(FaceError::NoFaceDetected)
        ));
    }

    #[test]
    fn crop_clamps_to_image() {
        let img = RgbImage::from_pixel(32, 24, image::Rgb([100, 120, 140]));
        let crop = crop_face(&img, &bx(-5.0, -5.0, 100.0, 100.0));
        assert_eq!(crop.dimensions(), (32, 24));

        let crop = crop_face(&img, &bx(8.0, 4.0, 16.0, 12.0));
        assert_eq!(crop.dimensions(), (8, 8));
    }
}
