//! Ranking: embeds a job description and a batch of documents, scores each document by cosine
//! similarity, and returns a stable top-K list.
//!
//! Per-document failures (extraction, embedding, bad vectors, duplicate identifiers) drop only
//! that document and are reported alongside the ranking. Only a failure to embed the job text
//! itself fails the call.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::embedding::{cosine_similarity, match_percentage, Embedder, EmbeddingError};
use crate::models::candidate::{DocumentFailure, RankedCandidate, TextDocument};

pub mod extract;
pub mod handlers;
pub mod names;

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type '{0}' (expected .pdf, .docx or .txt)")]
    UnsupportedFormat(String),

    #[error("Text is not valid UTF-8")]
    Encoding,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("No extractable text")]
    Empty,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Duplicate document identifier")]
    DuplicateIdentifier,
}

impl DocumentError {
    pub fn for_document(&self, identifier: &str) -> DocumentFailure {
        DocumentFailure {
            identifier: identifier.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Ranked candidates plus the documents that could not be ranked.
#[derive(Debug, Default)]
pub struct RankingOutcome {
    pub candidates: Vec<RankedCandidate>,
    pub failures: Vec<DocumentFailure>,
}

/// The Embedding Engine. Cheap to clone; the embedder is shared.
#[derive(Clone)]
pub struct RankingEngine {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl RankingEngine {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Embeds a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embedder.embed(text)
    }

    /// Ranks `documents` against `job_text`, highest similarity first, at most `top_k` entries.
    ///
    /// Equal scores keep input order. Blocking: call from the blocking pool in async code.
    pub fn rank(
        &self,
        job_text: &str,
        documents: &[TextDocument],
    ) -> Result<RankingOutcome, EmbeddingError> {
        if documents.is_empty() {
            return Ok(RankingOutcome::default());
        }

        let mut failures = Vec::new();
        let unique = dedupe_by_identifier(documents, &mut failures);

        let job_vector = self.embedder.embed(job_text)?;
        if let Err(reason) = check_vector(&job_vector, self.embedder.dimensions()) {
            return Err(EmbeddingError::Backend(format!(
                "job description produced an unusable vector: {reason}"
            )));
        }

        let mut scored: Vec<(&TextDocument, f32)> = Vec::with_capacity(unique.len());
        for (doc, embedded) in unique.iter().copied().zip(self.embed_documents(&unique)) {
            let checked = embedded.and_then(|v| {
                check_vector(&v, job_vector.len())
                    .map(|_| v)
                    .map_err(DocumentError::Embedding)
            });

            match checked {
                Ok(vector) => scored.push((doc, cosine_similarity(&job_vector, &vector))),
                Err(e) => {
                    warn!(document = %doc.identifier, "Excluding document from ranking: {e}");
                    failures.push(e.for_document(&doc.identifier));
                }
            }
        }

        // Stable sort: ties keep input order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.top_k);

        let candidates: Vec<RankedCandidate> = scored
            .into_iter()
            .map(|(doc, score)| RankedCandidate {
                identifier: doc.identifier.clone(),
                display_name: names::display_name(&doc.raw_text, &doc.identifier),
                similarity_score: score,
                match_percentage: match_percentage(score),
                ai_summary: None,
                ai_provider: None,
                ai_generated: false,
                ai_error: None,
                text: Some(doc.raw_text.clone()),
            })
            .collect();

        info!(
            ranked = candidates.len(),
            excluded = failures.len(),
            model = self.embedder.model_name(),
            "Ranking complete"
        );

        Ok(RankingOutcome {
            candidates,
            failures,
        })
    }

    /// One batch call; if the batch fails as a whole, retries document by document so a single
    /// bad input only costs itself.
    fn embed_documents(&self, docs: &[&TextDocument]) -> Vec<Result<Vec<f32>, DocumentError>> {
        let texts: Vec<&str> = docs.iter().map(|d| d.raw_text.as_str()).collect();

        match self.embedder.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == texts.len() => vectors.into_iter().map(Ok).collect(),
            Ok(vectors) => {
                warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "Batch embedding count mismatch, embedding documents individually"
                );
                self.embed_individually(&texts)
            }
            Err(e) => {
                warn!("Batch embedding failed ({e}), embedding documents individually");
                self.embed_individually(&texts)
            }
        }
    }

    fn embed_individually(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, DocumentError>> {
        texts
            .iter()
            .map(|t| {
                self.embedder
                    .embed(t)
                    .map_err(|e| DocumentError::Embedding(e.to_string()))
            })
            .collect()
    }
}

/// Keeps the first document for each identifier; later ones are reported as failures.
fn dedupe_by_identifier<'a>(
    documents: &'a [TextDocument],
    failures: &mut Vec<DocumentFailure>,
) -> Vec<&'a TextDocument> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(documents.len());

    for doc in documents {
        if seen.insert(doc.identifier.as_str()) {
            unique.push(doc);
        } else {
            debug!(document = %doc.identifier, "Skipping duplicate document");
            failures.push(DocumentError::DuplicateIdentifier.for_document(&doc.identifier));
        }
    }

    unique
}

fn check_vector(vector: &[f32], expected_dim: usize) -> Result<(), String> {
    if vector.len() != expected_dim {
        return Err(format!(
            "expected {expected_dim} dimensions, got {}",
            vector.len()
        ));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err("vector contains non-finite values".to_string());
    }
    Ok(())
}
