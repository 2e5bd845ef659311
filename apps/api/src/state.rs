use std::sync::Arc;

use crate::ai::AiManager;
use crate::config::Config;
use crate::ranking::RankingEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Embedding Engine. Shares one embedder across requests.
    pub ranking: RankingEngine,
    /// Owns the active AI provider and the outbound-call cooldown.
    pub ai: Arc<AiManager>,
    pub config: Config,
}
