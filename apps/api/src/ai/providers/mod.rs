//! AI Provider Abstraction: one capability ("summarize why this candidate fits") over several
//! back-ends with different auth, request and response shapes.
//!
//! Every back-end implements `SummaryProvider`. `build_provider` is the only constructor and is
//! an exhaustive match over `ProviderKind`.
//!
//! Providers make exactly one HTTP call per operation. Cooldown, timeouts around the whole
//! call, retries and fallback are the AI Manager's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ai::config::{ProviderConfig, ProviderKind};

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use openai::ChatCompletionsProvider;

/// Longest error body excerpt kept in an error message.
const ERROR_BODY_CHARS: usize = 300;

/// Uniform failure taxonomy, whatever the back-end.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Quota or rate limit exceeded (status {status}): {message}")]
    QuotaExceeded { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request rejected (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },
}

impl ProviderError {
    /// Whether trying again later could succeed without changing the configuration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::QuotaExceeded { .. }
        )
    }

    /// Short, actionable message for a person configuring `kind`.
    pub fn user_message(&self, kind: ProviderKind, model: &str) -> String {
        let name = kind.display_name();
        match self {
            ProviderError::Authentication { status: 403, .. } => format!(
                "Access forbidden for {name}. Your API key may not have permission for '{model}', \
                 or billing may need to be set up."
            ),
            ProviderError::Authentication { .. } => {
                format!("Invalid API key for {name}. Please check your API key and try again.")
            }
            ProviderError::QuotaExceeded { .. } => format!(
                "Rate limit or quota exceeded for {name}. Please wait a moment and try again, \
                 or try a different provider."
            ),
            ProviderError::Network(_) if kind == ProviderKind::Ollama => {
                "Ollama is not reachable. Start it with 'ollama serve' and try again.".to_string()
            }
            ProviderError::Network(detail) => format!(
                "Could not reach {name} ({detail}). \
                 Check your connection or try again in a few minutes."
            ),
            ProviderError::InvalidRequest { status: 404, .. } => format!(
                "API endpoint not found. Please verify the model '{model}' is available for {name}."
            ),
            ProviderError::InvalidRequest { message, .. } => format!(
                "{name} rejected the request for model '{model}': {message}"
            ),
            ProviderError::MalformedResponse(detail) => {
                format!("{name} returned an unexpected response: {detail}")
            }
        }
    }
}

/// Everything a provider needs to write one summary.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub job_text: String,
    pub candidate_name: String,
    pub candidate_text: String,
}

/// Result of a connection test.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

impl ConnectionReport {
    pub fn connected(kind: ProviderKind, model: &str) -> Self {
        Self {
            success: true,
            message: format!("Connected to {} ({model})", kind.display_name()),
        }
    }

    pub fn failed(error: &ProviderError, kind: ProviderKind, model: &str) -> Self {
        Self {
            success: false,
            message: error.user_message(kind, model),
        }
    }
}

/// The provider capability. Carried as `Arc<dyn SummaryProvider>`.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String, ProviderError>;

    /// Minimal call that proves credential + endpoint + model work.
    async fn ping(&self) -> Result<(), ProviderError>;

    /// `ping` turned into a report a person can act on.
    async fn test_connection(&self) -> ConnectionReport {
        match self.ping().await {
            Ok(()) => ConnectionReport::connected(self.kind(), self.model()),
            Err(e) => ConnectionReport::failed(&e, self.kind(), self.model()),
        }
    }
}

/// Builds the provider for a validated config. Adding a `ProviderKind` variant fails to compile
/// until it is handled here.
pub fn build_provider(config: &ProviderConfig, client: Client) -> Arc<dyn SummaryProvider> {
    match config.kind {
        ProviderKind::OpenAi | ProviderKind::Groq => {
            Arc::new(ChatCompletionsProvider::new(config.clone(), client))
        }
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config.clone(), client)),
        ProviderKind::Google => Arc::new(GoogleProvider::new(config.clone(), client)),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(config.clone(), client)),
    }
}

/// Shared HTTP client for all providers.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP plumbing shared by the back-ends
// ────────────────────────────────────────────────────────────────────────────

/// Sends a JSON request and decodes a JSON response, mapping every failure onto
/// `ProviderError`.
pub(crate) async fn send_json<B, R>(request: RequestBuilder, body: &B) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(classify_status(status, &text));
    }

    debug!(status = status.as_u16(), bytes = text.len(), "Provider call succeeded");

    serde_json::from_str(&text).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Network("request timed out".to_string())
    } else if e.is_connect() {
        ProviderError::Network(format!("connection failed: {e}"))
    } else if e.is_decode() {
        ProviderError::MalformedResponse(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Maps a non-success status (and whatever error body came with it) onto the taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let code = status.as_u16();
    let message = error_message(body);

    match code {
        401 | 403 => ProviderError::Authentication {
            status: code,
            message,
        },
        402 | 429 => ProviderError::QuotaExceeded {
            status: code,
            message,
        },
        408 => ProviderError::Network(format!("status 408: {message}")),
        _ if status.is_server_error() => {
            ProviderError::Network(format!("status {code}: {message}"))
        }
        _ => ProviderError::InvalidRequest {
            status: code,
            message,
        },
    }
}

/// Pulls a human message out of the usual error shapes: `{"error": {"message": ..}}`,
/// `{"error": ".."}`, `{"message": ".."}`; otherwise the raw body, shortened.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error"))
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no error details".to_string()
        } else {
            trimmed.chars().take(ERROR_BODY_CHARS).collect()
        }
    })
}

/// Trims provider output and rejects empty text.
pub(crate) fn non_empty(text: Option<&str>) -> Result<String, ProviderError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(ProviderError::MalformedResponse(
            "response contained no text".to_string(),
        )),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_and_quota() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad key"}}"#),
            ProviderError::Authentication { status: 401, ref message } if message == "bad key"
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::QuotaExceeded { status: 429, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::PAYMENT_REQUIRED, ""),
            ProviderError::QuotaExceeded { status: 402, .. }
        ));
    }

    #[test]
    fn test_classify_server_errors_as_network() {
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ProviderError::Network(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, ""),
            ProviderError::Network(_)
        ));
    }

    #[test]
    fn test_classify_other_client_errors() {
        match classify_status(StatusCode::NOT_FOUND, r#"{"error":"model not found"}"#) {
            ProviderError::InvalidRequest { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("   "), "no error details");
        assert_eq!(error_message(&"x".repeat(1000)).len(), ERROR_BODY_CHARS);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  hi  ")).unwrap(), "hi");
        assert!(non_empty(Some(" ")).is_err());
        assert!(non_empty(None).is_err());
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Network("x".into()).is_transient());
        assert!(!ProviderError::MalformedResponse("x".into()).is_transient());
        assert!(!ProviderError::Authentication {
            status: 401,
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_user_messages_are_provider_aware() {
        let ollama_down = ProviderError::Network("connection refused".into())
            .user_message(ProviderKind::Ollama, "llama2");
        assert!(ollama_down.contains("ollama serve"));

        let bad_key = ProviderError::Authentication {
            status: 401,
            message: "invalid".into(),
        }
        .user_message(ProviderKind::OpenAi, "gpt-4");
        assert!(bad_key.contains("Invalid API key for OpenAI"));

        let missing_model = ProviderError::InvalidRequest {
            status: 404,
            message: String::new(),
        }
        .user_message(ProviderKind::Google, "gemini-pro");
        assert!(missing_model.contains("gemini-pro"));
    }

    #[test]
    fn test_build_provider_covers_every_kind() {
        let client = Client::new();
        for kind in ProviderKind::ALL {
            let config = test_support::config_for(kind.as_str(), "http://localhost:1");
            assert_eq!(build_provider(&config, client.clone()).kind(), kind);
        }
    }
}
