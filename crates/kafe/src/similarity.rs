/// Cosine similarity between two vectors; 0.0 for mismatched lengths or zero vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let (dot, norm_a, norm_b) =
    a.iter().zip(b).fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
      (dot + x * y, na + x * x, nb + y * y)
    });

  let denominator = norm_a.sqrt() * norm_b.sqrt();
  if denominator == 0.0 {
    return 0.0;
  }
  dot / denominator
}
