use serde::{Deserialize, Serialize};

/// A document handed to the core by the extraction adapter. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    /// Source identifier, usually the uploaded filename.
    pub identifier: String,
    pub raw_text: String,
}

impl TextDocument {
    pub fn new(identifier: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// One row of the ranking, optionally enriched by the AI stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    pub identifier: String,
    pub display_name: String,
    pub similarity_score: f32,
    /// 0 – 100, one decimal. Same order as `similarity_score`.
    pub match_percentage: f32,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    /// Why the AI summary for this candidate fell back, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    /// Full document text, kept so the AI stage can read it.
    #[serde(default)]
    pub text: Option<String>,
}

/// A document that was dropped from the ranking, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFailure {
    pub identifier: String,
    pub reason: String,
}
