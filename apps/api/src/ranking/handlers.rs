use std::time::Instant;

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::candidate::{DocumentFailure, RankedCandidate, TextDocument};
use crate::ranking::extract::extract_text;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub message: String,
    pub candidates: Vec<RankedCandidate>,
    pub errors: Vec<DocumentFailure>,
    pub total_processed: usize,
    /// Seconds, two decimals.
    pub processing_time: f64,
}

struct Upload {
    filename: String,
    data: Bytes,
}

/// POST /api/v1/recommend
/// Multipart: one `job_description` text field and one or more `files` parts.
pub async fn handle_recommend(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RecommendResponse>, AppError> {
    let started = Instant::now();
    let mut job_description = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                job_description = field.text().await.map_err(invalid_multipart)?;
            }
            "files" | "files[]" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("upload_{}", uploads.len() + 1));
                let data = field.bytes().await.map_err(invalid_multipart)?;
                uploads.push(Upload { filename, data });
            }
            other => warn!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    let job_description = job_description.trim().to_string();
    if job_description.is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    if uploads.is_empty() {
        return Err(AppError::Validation(
            "Please upload at least one resume file".to_string(),
        ));
    }

    let total_processed = uploads.len();
    info!(files = total_processed, "Processing recommendation request");

    let engine = state.ranking.clone();
    let (outcome, mut errors) = tokio::task::spawn_blocking(move || {
        let mut errors = Vec::new();
        let mut documents = Vec::with_capacity(uploads.len());

        for upload in uploads {
            match extract_text(&upload.filename, &upload.data) {
                Ok(text) => documents.push(TextDocument::new(upload.filename, text)),
                Err(e) => {
                    warn!(document = %upload.filename, "Text extraction failed: {e}");
                    errors.push(e.for_document(&upload.filename));
                }
            }
        }

        engine
            .rank(&job_description, &documents)
            .map(|outcome| (outcome, errors))
    })
    .await
    .context("ranking task failed")??;

    errors.extend(outcome.failures);
    let candidates = outcome.candidates;

    let message = if candidates.is_empty() {
        "No resumes could be ranked".to_string()
    } else {
        format!(
            "Found {} matching candidates out of {} resumes",
            candidates.len(),
            total_processed
        )
    };

    Ok(Json(RecommendResponse {
        success: !candidates.is_empty(),
        message,
        candidates,
        errors,
        total_processed,
        processing_time: (started.elapsed().as_secs_f64() * 100.0).round() / 100.0,
    }))
}

fn invalid_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}
