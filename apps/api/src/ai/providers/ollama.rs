//! Local Ollama back-end. No credential; the model must already be pulled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{non_empty, send_json, ProviderError, SummaryProvider, SummaryRequest};
use crate::ai::config::{ProviderConfig, ProviderKind};
use crate::ai::prompts::{
    summary_prompt, CONNECTION_TEST_MAX_TOKENS, CONNECTION_TEST_PROMPT, SUMMARY_SYSTEM,
};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct OllamaProvider {
    config: ProviderConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn generate(
        &self,
        body: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, ProviderError> {
        let url = format!("{}/api/generate", self.config.endpoint());
        send_json(self.client.post(url), body).await
    }
}

#[async_trait]
impl SummaryProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: &prompt,
            system: Some(SUMMARY_SYSTEM),
            stream: false,
            options: Options {
                num_predict: self.config.max_tokens,
                temperature: Some(self.config.temperature),
            },
        };

        let response = self.generate(&body).await?;
        non_empty(response.response.as_deref())
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: CONNECTION_TEST_PROMPT,
            system: None,
            stream: false,
            options: Options {
                num_predict: CONNECTION_TEST_MAX_TOKENS,
                temperature: None,
            },
        };
        self.generate(&body).await.map(|_| ())
    }
}
