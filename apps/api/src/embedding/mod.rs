//! Embedding Engine primitives: the `Embedder` seam, vector similarity, and score display.
//!
//! Two backends implement `Embedder`:
//! - `FastEmbedder`: in-process ONNX sentence model (all-MiniLM-L6-v2 by default), loaded once
//!   per process.
//! - `HashingEmbedder`: deterministic lexical feature hashing, no model download. Used offline
//!   and in tests.

use thiserror::Error;

pub mod fastembed;
pub mod hashing;

pub use self::fastembed::FastEmbedder;
pub use self::hashing::HashingEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding model failed to load: {0}")]
    ModelLoad(String),

    #[error("Embedding backend error: {0}")]
    Backend(String),

    #[error("Embedding backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Turns text into fixed-length vectors.
///
/// Implementations are synchronous and CPU-bound; async callers run them on the blocking pool.
/// Shared across requests as `Arc<dyn Embedder>`.
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, returning one vector per input in the same order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text])?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            got => Err(EmbeddingError::CountMismatch { expected: 1, got }),
        }
    }

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a zero-norm vector
/// (the embedding of an empty document under the hashing backend).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Display transform of a similarity score: clamp to `[0, 1]`, scale to percent, one decimal.
/// Negative similarities show as 0%.
pub fn match_percentage(similarity: f32) -> f32 {
    (similarity.clamp(0.0, 1.0) * 1000.0).round() / 10.0
}

/// L2-normalizes in place. Zero vectors are left untouched.
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_defined() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_match_percentage_clamps_negative_to_zero() {
        assert_eq!(match_percentage(-0.4), 0.0);
        assert_eq!(match_percentage(1.3), 100.0);
    }

    #[test]
    fn test_match_percentage_rounds_to_one_decimal() {
        assert_eq!(match_percentage(0.7346), 73.5);
        assert_eq!(match_percentage(0.12), 12.0);
    }

    #[test]
    fn test_match_percentage_is_monotonic() {
        let scores = [-1.0, -0.2, 0.0, 0.05, 0.3301, 0.3302, 0.5, 0.99, 1.0];
        for pair in scores.windows(2) {
            assert!(match_percentage(pair[1]) >= match_percentage(pair[0]));
        }
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
