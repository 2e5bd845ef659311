pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::ranking::handlers as ranking;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ranking
        .route("/api/v1/recommend", post(ranking::handle_recommend))
        // AI provider management and summaries
        .route("/api/v1/ai/providers", get(ai::handle_providers))
        .route("/api/v1/ai/status", get(ai::handle_status))
        .route(
            "/api/v1/ai/configure",
            post(ai::handle_configure).delete(ai::handle_clear),
        )
        .route("/api/v1/ai/test", post(ai::handle_test))
        .route("/api/v1/ai/summaries", post(ai::handle_summaries))
        .with_state(state)
}
