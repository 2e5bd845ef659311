use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai::{whole_seconds, AiError};
use crate::embedding::EmbeddingError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider verification failed: {0}")]
    Verification(String),

    #[error("No AI provider configured")]
    NotConfigured,

    #[error("Rate limit cooldown active ({retry_after_secs}s)")]
    CooldownActive { retry_after_secs: u64 },

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Configuration(msg) => AppError::Configuration(msg),
            AiError::Verification(msg) => AppError::Verification(msg),
            AiError::NotConfigured => AppError::NotConfigured,
            AiError::CooldownActive { retry_after } => AppError::CooldownActive {
                retry_after_secs: whole_seconds(&retry_after),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Configuration(msg) => {
                (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR", msg.clone())
            }
            AppError::Verification(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PROVIDER_VERIFICATION_FAILED",
                msg.clone(),
            ),
            AppError::NotConfigured => (
                StatusCode::CONFLICT,
                "AI_NOT_CONFIGURED",
                "No AI provider configured".to_string(),
            ),
            AppError::CooldownActive { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_COOLDOWN",
                format!(
                    "Rate limit cooldown active. \
                     Please wait {retry_after_secs} seconds before testing again."
                ),
            ),
            AppError::Embedding(e) => {
                tracing::error!("Embedding error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EMBEDDING_ERROR",
                    "The job description could not be embedded".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        if let AppError::CooldownActive { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
