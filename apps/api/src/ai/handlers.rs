use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::ai::config::{catalog, CatalogEntry, ProviderConfigRequest, ProviderInfo};
use crate::ai::manager::{AiStatus, SummaryStats};
use crate::ai::providers::ConnectionReport;
use crate::errors::AppError;
use crate::models::candidate::RankedCandidate;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<CatalogEntry>,
}

#[derive(Serialize)]
pub struct ConfigureResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_info: Option<ProviderInfo>,
}

#[derive(Deserialize)]
pub struct SummariesRequest {
    pub job_description: String,
    pub candidates: Vec<RankedCandidate>,
    #[serde(default)]
    pub max_summaries: Option<usize>,
}

#[derive(Serialize)]
pub struct SummariesResponse {
    pub success: bool,
    pub message: String,
    pub candidates: Vec<RankedCandidate>,
    pub stats: SummaryStats,
}

/// GET /api/v1/ai/providers
pub async fn handle_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: catalog(),
    })
}

/// GET /api/v1/ai/status
pub async fn handle_status(State(state): State<AppState>) -> Json<AiStatus> {
    Json(state.ai.status().await)
}

/// POST /api/v1/ai/configure
/// Tests the configuration before making it active.
pub async fn handle_configure(
    State(state): State<AppState>,
    Json(req): Json<ProviderConfigRequest>,
) -> Result<Json<ConfigureResponse>, AppError> {
    let info = state.ai.configure_and_verify(req).await?;
    Ok(Json(ConfigureResponse {
        success: true,
        message: format!(
            "{} configured successfully with {}",
            info.provider.display_name(),
            info.model
        ),
        provider_info: Some(info),
    }))
}

/// DELETE /api/v1/ai/configure
pub async fn handle_clear(State(state): State<AppState>) -> Json<ConfigureResponse> {
    state.ai.clear().await;
    Json(ConfigureResponse {
        success: true,
        message: "AI configuration cleared".to_string(),
        provider_info: None,
    })
}

/// POST /api/v1/ai/test
pub async fn handle_test(
    State(state): State<AppState>,
) -> Result<Json<ConnectionReport>, AppError> {
    Ok(Json(state.ai.test_connection().await?))
}

/// POST /api/v1/ai/summaries
pub async fn handle_summaries(
    State(state): State<AppState>,
    Json(req): Json<SummariesRequest>,
) -> Result<Json<SummariesResponse>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }

    let max_summaries = req
        .max_summaries
        .unwrap_or(state.config.ai_default_max_summaries);
    let batch = state
        .ai
        .summarize_all(&req.job_description, req.candidates, max_summaries)
        .await;

    let message = if batch.stats.summaries_generated > 0 {
        format!(
            "Generated {} AI summaries",
            batch.stats.summaries_generated
        )
    } else {
        "Added fallback summaries".to_string()
    };

    Ok(Json(SummariesResponse {
        success: true,
        message,
        candidates: batch.candidates,
        stats: batch.stats,
    }))
}
