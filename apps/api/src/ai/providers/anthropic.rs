//! Anthropic Messages API back-end.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{non_empty, send_json, ProviderError, SummaryProvider, SummaryRequest};
use crate::ai::config::{ProviderConfig, ProviderKind};
use crate::ai::prompts::{
    summary_prompt, CONNECTION_TEST_MAX_TOKENS, CONNECTION_TEST_PROMPT, SUMMARY_SYSTEM,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

pub struct AnthropicProvider {
    config: ProviderConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn call(&self, body: &MessagesRequest<'_>) -> Result<MessagesResponse, ProviderError> {
        let url = format!("{}/messages", self.config.endpoint());
        let request = self
            .client
            .post(url)
            .header("x-api-key", &self.config.credential)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let response: MessagesResponse = send_json(request, body).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Anthropic call: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl SummaryProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
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
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: Some(SUMMARY_SYSTEM),
            temperature: Some(self.config.temperature),
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        let response = self.call(&body).await?;
        non_empty(response.text())
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: CONNECTION_TEST_MAX_TOKENS,
            system: None,
            temperature: None,
            messages: vec![Message {
                role: "user",
                content: CONNECTION_TEST_PROMPT,
            }],
        };
        self.call(&body).await.map(|_| ())
    }
}
