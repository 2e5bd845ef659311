//! Google Gemini `generateContent` back-end.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{non_empty, send_json, ProviderError, SummaryProvider, SummaryRequest};
use crate::ai::config::{ProviderConfig, ProviderKind};
use crate::ai::prompts::{
    summary_prompt, CONNECTION_TEST_MAX_TOKENS, CONNECTION_TEST_PROMPT, SUMMARY_SYSTEM,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.iter().find_map(|p| p.text.as_deref()))
    }
}

pub struct GoogleProvider {
    config: ProviderConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn generate(
        &self,
        body: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint(),
            self.config.model
        );
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.credential);
        send_json(request, body).await
    }
}

#[async_trait]
impl SummaryProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String, ProviderError> {
        // The v1 API has no system role; the instructions lead the user turn.
        let prompt = format!(
            "{SUMMARY_SYSTEM}\n\n{}",
            summary_prompt(
                &request.job_text,
                &request.candidate_name,
                &request.candidate_text
            )
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: Some(self.config.temperature),
            },
        };

        let response = self.generate(&body).await?;
        non_empty(response.text())
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: CONNECTION_TEST_PROMPT,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: CONNECTION_TEST_MAX_TOKENS,
                temperature: None,
            },
        };
        self.generate(&body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::providers::test_support::{config_for, summary_request, UNREACHABLE};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(endpoint: &str) -> GoogleProvider {
        GoogleProvider::new(config_for("google", endpoint), Client::new())
    }

    #[tokio::test]
    async fn test_generate_summary_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .and(header("x-goog-api-key", "test-key-123"))
            .and(body_partial_json(json!({
                "generationConfig": {"maxOutputTokens": 200}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Solid AWS background."}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = provider(&server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap();
        assert_eq!(summary, "Solid AWS background.");
    }

    #[tokio::test]
    async fn test_blocked_prompt_has_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unknown_model_is_invalid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "models/gemini-pro is not found",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).ping().await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest { status: 404, .. }));
        assert!(err
            .user_message(ProviderKind::Google, "gemini-pro")
            .contains("API endpoint not found"));
    }

    #[tokio::test]
    async fn test_quota_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::QuotaExceeded { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let err = provider(UNREACHABLE).ping().await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
