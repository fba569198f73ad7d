use image::{Rgb, RgbImage};

/// The fixed augmentation set generated at face enrollment.
///
/// These variants feed offline retraining and evaluation; only the
/// original crop's embedding ever enters the live model store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentKind {
    Original,
    FlipHorizontal,
    RotatePlus15,
    RotateMinus15,
    BrightenUp20,
    BrightenDown20,
}

impl AugmentKind {
    /// Stable artifact name for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            AugmentKind::Original => "original",
            AugmentKind::FlipHorizontal => "flip",
            AugmentKind::RotatePlus15 => "rot_p15",
            AugmentKind::RotateMinus15 => "rot_m15",
            AugmentKind::BrightenUp20 => "bright_p20",
            AugmentKind::BrightenDown20 => "bright_m20",
        }
    }
}

/// Generates the fixed augmentation set from a face crop:
/// the original, a horizontal flip, ±15° rotations (expanded canvas),
/// and ±20% brightness.
pub fn augment(face: &RgbImage) -> Vec<(AugmentKind, RgbImage)> {
    vec![
        (AugmentKind::Original, face.clone()),
        (AugmentKind::FlipHorizontal, image::imageops::flip_horizontal(face)),
        (AugmentKind::RotatePlus15, rotate(face, 15.0)),
        (AugmentKind::RotateMinus15, rotate(face, -15.0)),
        (AugmentKind::BrightenUp20, scale_brightness(face, 1.2)),
        (AugmentKind::BrightenDown20, scale_brightness(face, 0.8)),
    ]
}

/// Multiplies every channel by `factor`, saturating at 255.
fn scale_brightness(img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        for c in 0..3 {
            p.0[c] = (p.0[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Rotates counterclockwise by `degrees` around the image center onto an
/// expanded canvas, bilinear-sampled, out-of-range pixels black.
fn rotate(img: &RgbImage, degrees: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    let new_w = (w as f32 * cos.abs() + h as f32 * sin.abs()).ceil() as u32;
    let new_h = (w as f32 * sin.abs() + h as f32 * cos.abs()).ceil() as u32;

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let ncx = new_w as f32 / 2.0;
    let ncy = new_h as f32 / 2.0;

    let mut out = RgbImage::from_pixel(new_w, new_h, Rgb([0, 0, 0]));
    for y in 0..new_h {
        for x in 0..new_w {
            // Inverse-map destination back into the source.
            let dx = x as f32 + 0.5 - ncx;
            let dy = y as f32 + 0.5 - ncy;
            let sx = cos * dx - sin * dy + cx - 0.5;
            let sy = sin * dx + cos * dy + cy - 0.5;
            if let Some(px) = sample_bilinear(img, sx, sy) {
                out.put_pixel(x, y, px);
            }
        }
    }
    out
}

/// Bilinear sample at fractional coordinates; `None` outside the image.
fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f32 || y > (h - 1) as f32 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00.0[c] as f32 * (1.0 - fx) + p10.0[c] as f32 * fx;
        let bot = p01.0[c] as f32 * (1.0 - fx) + p11.0[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}
