/// Compute the Euclidean distance between two embedding vectors.
///
/// Lower means more similar; face verification accepts when the distance
/// is at or below the threshold. Uses f64 intermediate precision.
/// Returns `f32::INFINITY` for a dimension mismatch so a malformed
/// comparison can never turn into an accept.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    let mut acc: f64 = 0.0;
    for i in 0..a.len() {
        let d = a[i] as f64 - b[i] as f64;
        acc += d * d;
    }
    acc.sqrt() as f32
}
