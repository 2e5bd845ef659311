//! Local sentence-embedding backend using fastembed-rs (ONNX Runtime).
//!
//! The ONNX session is expensive to build (model download on first run, then a few hundred
//! milliseconds to load), so it lives in a process-wide `OnceCell`. The first `embed_batch`
//! call initializes it; concurrent first callers block on the same initialization and exactly
//! one load happens. A failed load is not cached, so a later call can retry.
//!
//! Default model: `AllMiniLML6V2` (384d), the model the ranking thresholds were tuned on.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use super::{Embedder, EmbeddingError};

/// Process-wide model instance. `embed()` needs `&mut`, hence the mutex.
static MODEL: OnceCell<LoadedModel> = OnceCell::new();

struct LoadedModel {
    name: String,
    session: Mutex<TextEmbedding>,
}

/// Model name → `EmbeddingModel` variant mapping.
///
/// Falls back to `AllMiniLML6V2` for unknown names.
pub fn parse_model_name(name: &str) -> EmbeddingModel {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-minilm-l12-v2" | "sentence-transformers/all-minilm-l12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
        "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
        "multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
        _ => {
            warn!(
                model = name,
                "Unknown EMBEDDING_MODEL, falling back to all-MiniLM-L6-v2 (384d)"
            );
            EmbeddingModel::AllMiniLML6V2
        }
    }
}

fn model_dimensions(model: &EmbeddingModel) -> usize {
    TextEmbedding::get_model_info(model)
        .map(|info| info.dim)
        .unwrap_or(384)
}

/// Handle to the shared ONNX model. Cheap to construct; the model itself loads lazily.
pub struct FastEmbedder {
    model: EmbeddingModel,
    model_name: String,
    dimensions: usize,
    cache_dir: Option<PathBuf>,
}

impl FastEmbedder {
    pub fn new(model: EmbeddingModel, cache_dir: Option<PathBuf>) -> Self {
        let dimensions = model_dimensions(&model);
        let model_name = format!("{model:?}");
        Self {
            model,
            model_name,
            dimensions,
            cache_dir,
        }
    }

    /// Forces the one-time model load. Used for startup warm-up.
    pub fn warm_up(&self) -> Result<(), EmbeddingError> {
        self.loaded().map(|_| ())
    }

    fn loaded(&self) -> Result<&'static LoadedModel, EmbeddingError> {
        let loaded = MODEL.get_or_try_init(|| {
            info!(model = %self.model_name, "Loading embedding model (first use)");

            let mut options =
                TextInitOptions::new(self.model.clone()).with_show_download_progress(false);
            if let Some(dir) = &self.cache_dir {
                options = options.with_cache_dir(dir.clone());
            }

            let session = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

            info!(
                model = %self.model_name,
                dimensions = self.dimensions,
                "Embedding model loaded"
            );

            Ok::<_, EmbeddingError>(LoadedModel {
                name: self.model_name.clone(),
                session: Mutex::new(session),
            })
        })?;

        if loaded.name != self.model_name {
            warn!(
                requested = %self.model_name,
                loaded = %loaded.name,
                "Embedding model already loaded for this process; reusing it"
            );
        }

        Ok(loaded)
    }
}

impl Embedder for FastEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let loaded = self.loaded()?;
        let mut session = loaded
            .session
            .lock()
            .map_err(|_| EmbeddingError::Backend("embedding session lock poisoned".to_string()))?;

        let vectors = session
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_parse_model_name_known() {
        assert_eq!(
            parse_model_name("all-minilm-l6-v2"),
            EmbeddingModel::AllMiniLML6V2
        );
        assert_eq!(
            parse_model_name("BGE-SMALL-EN-V1.5"),
            EmbeddingModel::BGESmallENV15,
            "case-insensitive"
        );
    }

    #[test]
    fn test_parse_model_name_unknown_fallback() {
        assert_eq!(
            parse_model_name("not-a-model"),
            EmbeddingModel::AllMiniLML6V2
        );
    }

    #[test]
    fn test_default_model_is_384d() {
        let embedder = FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None);
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_name(), "AllMiniLML6V2");
    }

    #[test]
    fn test_empty_batch_does_not_load_model() {
        let embedder = FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None);
        assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    }

    // The tests below download the ONNX model (~90MB) on first run.
    // Run explicitly: cargo test -- fastembed --ignored

    #[test]
    #[ignore = "requires ONNX model download"]
    fn test_embedding_is_deterministic() {
        let embedder = FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None);
        let a = embedder.embed("Rust backend engineer").unwrap();
        let b = embedder.embed("Rust backend engineer").unwrap();
        assert_eq!(a.len(), 384);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    #[ignore = "requires ONNX model download"]
    fn test_empty_text_still_embeds() {
        let embedder = FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None);
        let v = embedder.embed("   ").unwrap();
        assert_eq!(v.len(), 384);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    #[ignore = "requires ONNX model download"]
    fn test_concurrent_first_use_loads_once() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let embedder = FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None);
                    embedder.embed(&format!("warm-up text {i}")).map(|v| v.len())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 384);
        }
        assert!(MODEL.get().is_some());
    }

    #[test]
    #[ignore = "requires ONNX model download"]
    fn test_python_resume_outranks_marketing_resume() {
        use crate::models::candidate::TextDocument;
        use crate::ranking::RankingEngine;
        use std::sync::Arc;

        let engine = RankingEngine::new(
            Arc::new(FastEmbedder::new(EmbeddingModel::AllMiniLML6V2, None)),
            10,
        );
        let documents = vec![
            TextDocument::new("a.txt", "6 years Python, FastAPI, AWS certified"),
            TextDocument::new("b.txt", "Marketing specialist, social media"),
        ];
        let outcome = engine
            .rank("Senior Python developer, 5+ years, FastAPI, AWS", &documents)
            .unwrap();

        assert_eq!(outcome.candidates[0].identifier, "a.txt");
        assert!(outcome.candidates[0].match_percentage > 70.0);
        assert!(outcome.candidates[1].match_percentage < 30.0);
    }
}
