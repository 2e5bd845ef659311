//! AI Manager: owns the active provider configuration and enriches ranked candidates with
//! summaries.
//!
//! Invariants:
//! - Every outbound provider call goes through the shared `Cooldown`.
//! - A summary batch reads the active provider once; a concurrent reconfigure does not leak
//!   into a batch already running.
//! - `summarize_all` never fails. Every candidate comes back, in input order, with a summary:
//!   AI-written, or a deterministic template when there is no provider, no text, a provider
//!   error, or the candidate is beyond `max_count`.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ai::config::{ProviderConfig, ProviderConfigRequest, ProviderInfo};
use crate::ai::cooldown::Cooldown;
use crate::ai::prompts::excerpt;
use crate::ai::providers::{
    build_provider, ConnectionReport, ProviderError, SummaryProvider, SummaryRequest,
};
use crate::ai::AiError;
use crate::models::candidate::RankedCandidate;

pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

const FALLBACK_UNCONFIGURED: &str = "Fallback (No AI Configured)";
const FALLBACK_ERROR: &str = "Fallback (AI Error)";
const FALLBACK_NO_TEXT: &str = "Fallback (No Resume Text)";
const FALLBACK_LIMIT: &str = "Fallback (Summary Limit)";

/// Longest job title line quoted in a templated summary.
const JOB_TITLE_CHARS: usize = 80;

/// A validated config together with the provider built from it. Swapped as a unit.
pub struct ActiveProvider {
    pub config: ProviderConfig,
    pub provider: Arc<dyn SummaryProvider>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AiStatus {
    pub configured: bool,
    pub provider_info: Option<ProviderInfo>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryStats {
    pub summaries_generated: usize,
    pub summaries_failed: usize,
    pub total_candidates: usize,
    pub estimated_cost: f64,
    pub provider_info: Option<ProviderInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryBatch {
    pub candidates: Vec<RankedCandidate>,
    pub stats: SummaryStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Generated,
    Failed,
    Skipped,
}

pub struct AiManager {
    active: RwLock<Option<Arc<ActiveProvider>>>,
    cooldown: Cooldown,
    client: Client,
    max_concurrency: usize,
    call_timeout: Duration,
}

impl AiManager {
    pub fn new(
        cooldown: Cooldown,
        max_concurrency: usize,
        call_timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            active: RwLock::new(None),
            cooldown,
            client,
            max_concurrency: max_concurrency.max(1),
            call_timeout,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Configuration
    // ────────────────────────────────────────────────────────────────────────

    /// Validates and installs a configuration without contacting the provider.
    pub async fn configure(&self, request: ProviderConfigRequest) -> Result<ProviderInfo, AiError> {
        let config = ProviderConfig::from_request(request)?;
        let provider = build_provider(&config, self.client.clone());
        Ok(self.install(config, provider).await)
    }

    /// Validates, tests, and only then installs. On any failure the previous configuration stays
    /// active.
    pub async fn configure_and_verify(
        &self,
        request: ProviderConfigRequest,
    ) -> Result<ProviderInfo, AiError> {
        let config = ProviderConfig::from_request(request)?;
        let provider = build_provider(&config, self.client.clone());

        self.cooldown.acquire().await;
        if let Err(e) = self.ping(provider.as_ref()).await {
            warn!(
                provider = %config.kind,
                model = %config.model,
                "Provider verification failed: {}",
                e
            );
            return Err(AiError::Verification(
                e.user_message(config.kind, &config.model),
            ));
        }

        Ok(self.install(config, provider).await)
    }

    pub(crate) async fn install(
        &self,
        config: ProviderConfig,
        provider: Arc<dyn SummaryProvider>,
    ) -> ProviderInfo {
        let info = config.info();
        info!(
            provider = %config.kind,
            model = %config.model,
            endpoint = %config.endpoint(),
            "AI provider configured"
        );
        *self.active.write().await = Some(Arc::new(ActiveProvider { config, provider }));
        info
    }

    pub async fn clear(&self) {
        if self.active.write().await.take().is_some() {
            info!("AI provider configuration cleared");
        }
    }

    pub async fn status(&self) -> AiStatus {
        let active = self.snapshot().await;
        AiStatus {
            configured: active.is_some(),
            provider_info: active.map(|a| a.config.info()),
        }
    }

    /// Explicit connection test. Rejects instead of waiting while the cooldown is active.
    pub async fn test_connection(&self) -> Result<ConnectionReport, AiError> {
        let active = self.snapshot().await.ok_or(AiError::NotConfigured)?;

        self.cooldown
            .try_acquire()
            .await
            .map_err(|retry_after| AiError::CooldownActive { retry_after })?;

        let provider = active.provider.as_ref();
        let report = tokio::time::timeout(self.call_timeout, provider.test_connection())
            .await
            .unwrap_or_else(|_| {
                ConnectionReport::failed(&self.timeout_error(), provider.kind(), provider.model())
            });
        Ok(report)
    }

    async fn snapshot(&self) -> Option<Arc<ActiveProvider>> {
        self.active.read().await.clone()
    }

    async fn ping(&self, provider: &dyn SummaryProvider) -> Result<(), ProviderError> {
        match tokio::time::timeout(self.call_timeout, provider.ping()).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error()),
        }
    }

    fn timeout_error(&self) -> ProviderError {
        ProviderError::Network(format!(
            "provider call timed out after {}s",
            self.call_timeout.as_secs()
        ))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Summaries
    // ────────────────────────────────────────────────────────────────────────

    /// Enriches every candidate. The first `max_count` are sent to the provider (at most
    /// `max_concurrency` at once, each behind the cooldown); the rest get the template.
    pub async fn summarize_all(
        &self,
        job_text: &str,
        candidates: Vec<RankedCandidate>,
        max_count: usize,
    ) -> SummaryBatch {
        let active = self.snapshot().await;
        let total_candidates = candidates.len();
        let job_title = job_title(job_text);

        info!(
            total_candidates,
            max_count,
            configured = active.is_some(),
            "Generating candidate summaries"
        );

        let results: Vec<(RankedCandidate, Outcome)> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(idx, candidate)| {
                    self.summarize_one(
                        active.as_deref(),
                        job_text,
                        &job_title,
                        candidate,
                        idx < max_count,
                    )
                })
                .buffered(self.max_concurrency)
                .collect()
                .await;

        let summaries_generated = results
            .iter()
            .filter(|(_, o)| *o == Outcome::Generated)
            .count();
        let summaries_failed = results
            .iter()
            .filter(|(_, o)| *o == Outcome::Failed)
            .count();
        let estimated_cost = active
            .as_ref()
            .map(|a| summaries_generated as f64 * a.config.kind.cost_per_call())
            .unwrap_or(0.0);

        info!(
            summaries_generated,
            summaries_failed, estimated_cost, "Candidate summaries complete"
        );

        SummaryBatch {
            candidates: results.into_iter().map(|(c, _)| c).collect(),
            stats: SummaryStats {
                summaries_generated,
                summaries_failed,
                total_candidates,
                estimated_cost,
                provider_info: active.map(|a| a.config.info()),
            },
        }
    }

    async fn summarize_one(
        &self,
        active: Option<&ActiveProvider>,
        job_text: &str,
        job_title: &str,
        mut candidate: RankedCandidate,
        within_limit: bool,
    ) -> (RankedCandidate, Outcome) {
        let Some(active) = active else {
            apply_fallback(&mut candidate, job_title, FALLBACK_UNCONFIGURED, None);
            return (candidate, Outcome::Skipped);
        };
        if !within_limit {
            apply_fallback(&mut candidate, job_title, FALLBACK_LIMIT, None);
            return (candidate, Outcome::Skipped);
        }
        let text = match candidate.text.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                apply_fallback(&mut candidate, job_title, FALLBACK_NO_TEXT, None);
                return (candidate, Outcome::Skipped);
            }
        };

        let request = SummaryRequest {
            job_text: job_text.to_string(),
            candidate_name: candidate.display_name.clone(),
            candidate_text: text,
        };

        self.cooldown.acquire().await;
        let result = match tokio::time::timeout(
            self.call_timeout,
            active.provider.generate_summary(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error()),
        };

        match result {
            Ok(summary) => {
                candidate.ai_summary = Some(summary);
                candidate.ai_provider = Some(active.config.label());
                candidate.ai_generated = true;
                candidate.ai_error = None;
                (candidate, Outcome::Generated)
            }
            Err(e) => {
                warn!(
                    candidate = %candidate.identifier,
                    provider = %active.config.kind,
                    transient = e.is_transient(),
                    "Summary generation failed: {}",
                    e
                );
                apply_fallback(&mut candidate, job_title, FALLBACK_ERROR, Some(e.to_string()));
                (candidate, Outcome::Failed)
            }
        }
    }
}

/// First non-empty line of the job text, shortened. Quoted in templated summaries.
fn job_title(job_text: &str) -> String {
    job_text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| excerpt(l, JOB_TITLE_CHARS).to_string())
        .unwrap_or_else(|| "this role".to_string())
}

/// Deterministic summary built from name, score and job title only.
pub fn fallback_summary(candidate: &RankedCandidate, job_title: &str) -> String {
    format!(
        "{} shows a {:.1}% semantic match with the requirements for \"{}\". \
         Review the full resume to confirm how their experience lines up with the role, \
         or configure an AI provider for a detailed analysis.",
        candidate.display_name, candidate.match_percentage, job_title
    )
}

fn apply_fallback(
    candidate: &mut RankedCandidate,
    job_title: &str,
    provider_label: &str,
    error: Option<String>,
) {
    candidate.ai_summary = Some(fallback_summary(candidate, job_title));
    candidate.ai_provider = Some(provider_label.to_string());
    candidate.ai_generated = false;
    candidate.ai_error = error;
}
