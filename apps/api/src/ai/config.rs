//! Provider kinds, the provider catalog, and the validated `ProviderConfig`.
//!
//! `ProviderKind` is a closed set: catalog lookups and provider construction are exhaustive
//! `match`es, so a new back-end is not usable until every table below knows about it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ai::AiError;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Shortest credential accepted for back-ends that need one.
const MIN_CREDENTIAL_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Groq,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Groq,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::Groq => "Groq",
            ProviderKind::Ollama => "Ollama",
        }
    }

    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &[
                "gpt-4o-mini",
                "gpt-4o",
                "gpt-4",
                "gpt-4-turbo-preview",
                "gpt-3.5-turbo",
            ],
            ProviderKind::Anthropic => &[
                "claude-3-haiku-20240307",
                "claude-3-sonnet-20240229",
                "claude-3-5-sonnet-20241022",
            ],
            ProviderKind::Google => &["gemini-pro", "gemini-1.5-flash", "gemini-1.5-pro"],
            ProviderKind::Groq => &[
                "llama3-8b-8192",
                "llama3-70b-8192",
                "mixtral-8x7b-32768",
                "gemma-7b-it",
            ],
            ProviderKind::Ollama => &["llama2", "llama3", "mistral", "codellama", "vicuna"],
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::Anthropic => "claude-3-haiku-20240307",
            ProviderKind::Google => "gemini-pro",
            ProviderKind::Groq => "llama3-8b-8192",
            ProviderKind::Ollama => "llama2",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    /// Rough USD cost of one summary call (~900 prompt + 200 completion tokens).
    /// Local and free-tier back-ends report 0.
    pub fn cost_per_call(&self) -> f64 {
        match self {
            ProviderKind::OpenAi => 0.0022,
            ProviderKind::Anthropic => 0.0033,
            ProviderKind::Google => 0.0011,
            ProviderKind::Groq => 0.0,
            ProviderKind::Ollama => 0.0,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                AiError::Configuration(format!(
                    "Unsupported provider '{s}'. Choose one of: {}",
                    ProviderKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

/// Raw configuration as submitted by a user. Validated into `ProviderConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfigRequest {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub custom_endpoint: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// A validated provider configuration. Replaced wholesale, never mutated in place.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub credential: String,
    pub custom_endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// Credentials stay out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("credential", &"<redacted>")
            .field("custom_endpoint", &self.custom_endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    /// Validates a raw request. Empty model → the kind's default.
    pub fn from_request(request: ProviderConfigRequest) -> Result<Self, AiError> {
        let kind: ProviderKind = request.provider.parse()?;

        let custom_endpoint = request
            .custom_endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty());

        if let Some(endpoint) = &custom_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(AiError::Configuration(format!(
                    "Custom endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }

        let model = request
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| kind.default_model().to_string());

        // Custom endpoints (proxies, self-hosted gateways) may serve models outside the catalog.
        if custom_endpoint.is_none() && !kind.models().contains(&model.as_str()) {
            return Err(AiError::Configuration(format!(
                "Invalid model '{model}' for provider '{kind}'"
            )));
        }

        let credential = request
            .api_key
            .map(|k| k.trim().to_string())
            .unwrap_or_default();
        if kind.requires_credential() && credential.chars().count() < MIN_CREDENTIAL_LEN {
            return Err(AiError::Configuration(format!(
                "Please enter a valid API key for {}",
                kind.display_name()
            )));
        }

        let temperature = request.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AiError::Configuration(format!(
                "Temperature must be between 0 and 2, got {temperature}"
            )));
        }

        let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(AiError::Configuration(
                "max_tokens must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            kind,
            model,
            credential,
            custom_endpoint,
            temperature,
            max_tokens,
        })
    }

    /// Endpoint actually used for calls: the custom one, else the kind's default.
    pub fn endpoint(&self) -> &str {
        self.custom_endpoint
            .as_deref()
            .unwrap_or_else(|| self.kind.default_endpoint())
    }

    /// Label stored on enriched candidates, e.g. `OpenAI (gpt-4o-mini)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.kind.display_name(), self.model)
    }

    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: self.kind,
            model: self.model.clone(),
            endpoint: self
                .custom_endpoint
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            configured: true,
        }
    }
}

/// Public, credential-free view of the active configuration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderInfo {
    pub provider: ProviderKind,
    pub model: String,
    pub endpoint: String,
    pub configured: bool,
}

/// One catalog row for the provider picker.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub provider: ProviderKind,
    pub display_name: &'static str,
    pub models: &'static [&'static str],
    pub default_model: &'static str,
    pub requires_api_key: bool,
    pub cost_per_call: f64,
}

pub fn catalog() -> Vec<CatalogEntry> {
    ProviderKind::ALL
        .into_iter()
        .map(|kind| CatalogEntry {
            provider: kind,
            display_name: kind.display_name(),
            models: kind.models(),
            default_model: kind.default_model(),
            requires_api_key: kind.requires_credential(),
            cost_per_call: kind.cost_per_call(),
        })
        .collect()
}
