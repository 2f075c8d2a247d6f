/// `dot(a, b) / (|a|·|b|)`, or 0 when either vector has zero magnitude.
///
/// Callers are expected to pass equal lengths; extra components of the
/// longer slice are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// `1 - cosine_similarity`, in `[0, 2]`. A zero vector is at distance 1 from
/// everything, itself included.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}
