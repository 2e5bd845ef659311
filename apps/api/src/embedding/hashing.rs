//! Deterministic lexical embedder.
//!
//! Feature hashing over the set of lowercase alphanumeric tokens: each distinct token adds ±1
//! to one bucket, then the vector is L2-normalized. Cosine similarity between two such vectors
//! approximates normalized term overlap. No model download, no state, identical output for
//! identical text on every run.
//!
//! Empty or whitespace-only text yields the zero vector, whose similarity to anything is 0.0.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use super::{l2_normalize, Embedder, EmbeddingError};

pub const DEFAULT_DIMENSIONS: usize = 2048;

/// Tokens shorter than this carry no signal ("5+", "a", "&").
const MIN_TOKEN_LEN: usize = 2;

#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

/// Distinct lowercase alphanumeric tokens, in sorted order.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

impl Embedder for HashingEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashing-lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Senior Rust engineer").unwrap();
        let b = embedder.embed("Senior Rust engineer").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_correct_dimensions() {
        let embedder = HashingEmbedder::new(384);
        assert_eq!(embedder.embed("test text").unwrap().len(), 384);
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("Python, FastAPI and AWS").unwrap();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Python, FastAPI; AWS").unwrap();
        let b = embedder.embed("aws fastapi python").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("   \n\t").unwrap();
        assert_eq!(v.len(), DEFAULT_DIMENSIONS);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_batch_matches_single() {
        let embedder = HashingEmbedder::default();
        let batch = embedder.embed_batch(&["alpha beta", "gamma delta"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("gamma delta").unwrap());
    }

    #[test]
    fn test_tokenize_drops_short_tokens_and_dedupes() {
        let tokens = tokenize("5+ years of Python, python, PYTHON");
        let expected: BTreeSet<String> = ["years", "of", "python"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
    }
}
