//! OpenAI-style chat completions. Serves both OpenAI and Groq, whose inference API speaks the
//! same `/chat/completions` schema with bearer auth.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{non_empty, send_json, ProviderError, SummaryProvider, SummaryRequest};
use crate::ai::config::{ProviderConfig, ProviderKind};
use crate::ai::prompts::{
    summary_prompt, CONNECTION_TEST_MAX_TOKENS, CONNECTION_TEST_PROMPT, SUMMARY_SYSTEM,
};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

pub struct ChatCompletionsProvider {
    config: ProviderConfig,
    client: Client,
}

impl ChatCompletionsProvider {
    pub fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn complete(&self, body: &ChatRequest<'_>) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.config.endpoint());
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.config.credential);
        send_json(request, body).await
    }
}

#[async_trait]
impl SummaryProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        self.config.kind
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String, ProviderError> {
        let prompt = summary_prompt(
            &request.job_text,
            &request.candidate_name,
            &request.candidate_text,
        );
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SUMMARY_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };

        let response = self.complete(&body).await?;
        non_empty(response.text())
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: CONNECTION_TEST_PROMPT,
            }],
            max_tokens: CONNECTION_TEST_MAX_TOKENS,
            temperature: None,
        };
        self.complete(&body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::providers::test_support::{config_for, summary_request, UNREACHABLE};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(kind: &str, endpoint: &str) -> ChatCompletionsProvider {
        ChatCompletionsProvider::new(config_for(kind, endpoint), Client::new())
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn test_generate_summary_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key-123"))
            .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "max_tokens": 200})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("  Strong Python fit.  ")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let summary = provider("openai", &server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap();
        assert_eq!(summary, "Strong Python fit.");
    }

    #[tokio::test]
    async fn test_groq_uses_same_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "llama3-8b-8192"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Good match.")))
            .mount(&server)
            .await;

        let p = provider("groq", &server.uri());
        assert_eq!(p.kind(), ProviderKind::Groq);
        assert_eq!(
            p.generate_summary(&summary_request()).await.unwrap(),
            "Good match."
        );
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = provider("openai", &server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Authentication {
                status: 401,
                message: "Incorrect API key provided".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider("openai", &server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::QuotaExceeded { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "?"})))
            .mount(&server)
            .await;

        let err = provider("openai", &server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider("openai", &server.uri())
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_uses_tiny_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "max_tokens": 5,
                "messages": [{"role": "user", "content": "Test"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let report = provider("openai", &server.uri()).test_connection().await;
        assert!(report.success);
        assert_eq!(report.message, "Connected to OpenAI (gpt-3.5-turbo)");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let err = provider("openai", UNREACHABLE)
            .generate_summary(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));

        let report = provider("openai", UNREACHABLE).test_connection().await;
        assert!(!report.success);
    }
}
