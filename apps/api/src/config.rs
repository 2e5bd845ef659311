use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::ai::cooldown::DEFAULT_COOLDOWN;
use crate::ai::manager::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_CONCURRENCY};
use crate::ranking::DEFAULT_TOP_K;

/// Which embedding back-end the ranking engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Local ONNX sentence-embedding model.
    FastEmbed,
    /// Offline lexical feature hashing. No model download.
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fastembed" => Ok(EmbeddingBackend::FastEmbed),
            "hashing" => Ok(EmbeddingBackend::Hashing),
            other => bail!("EMBEDDING_BACKEND must be 'fastembed' or 'hashing', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_cache_dir: Option<PathBuf>,
    pub embedding_warmup: bool,
    pub ranking_top_k: usize,
    pub ai_cooldown: Duration,
    pub ai_max_concurrency: usize,
    pub ai_call_timeout: Duration,
    pub ai_default_max_summaries: usize,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = lookup("EMBEDDING_BACKEND").unwrap_or_else(|| "fastembed".to_string());
        let ai_max_concurrency: usize =
            parse_or(&lookup, "AI_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?;
        if ai_max_concurrency == 0 {
            bail!("AI_MAX_CONCURRENCY must be at least 1");
        }
        let ranking_top_k: usize = parse_or(&lookup, "RANKING_TOP_K", DEFAULT_TOP_K)?;
        if ranking_top_k == 0 {
            bail!("RANKING_TOP_K must be at least 1");
        }
        let max_upload_mb: usize = parse_or(&lookup, "MAX_UPLOAD_MB", 20)?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            embedding_backend: backend.parse()?,
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string()),
            embedding_cache_dir: lookup("EMBEDDING_CACHE_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            embedding_warmup: parse_or(&lookup, "EMBEDDING_WARMUP", false)?,
            ranking_top_k,
            ai_cooldown: Duration::from_secs(parse_or(
                &lookup,
                "AI_COOLDOWN_SECS",
                DEFAULT_COOLDOWN.as_secs(),
            )?),
            ai_max_concurrency,
            ai_call_timeout: Duration::from_secs(parse_or(
                &lookup,
                "AI_CALL_TIMEOUT_SECS",
                DEFAULT_CALL_TIMEOUT.as_secs(),
            )?),
            ai_default_max_summaries: parse_or(&lookup, "AI_DEFAULT_MAX_SUMMARIES", 5)?,
            max_upload_bytes: max_upload_mb
                .checked_mul(1024 * 1024)
                .context("MAX_UPLOAD_MB is too large")?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.embedding_backend, EmbeddingBackend::FastEmbed);
        assert_eq!(config.embedding_model, "all-minilm-l6-v2");
        assert!(config.embedding_cache_dir.is_none());
        assert!(!config.embedding_warmup);
        assert_eq!(config.ranking_top_k, 10);
        assert_eq!(config.ai_cooldown, Duration::from_secs(3));
        assert_eq!(config.ai_max_concurrency, 3);
        assert_eq!(config.ai_call_timeout, Duration::from_secs(30));
        assert_eq!(config.ai_default_max_summaries, 5);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9000"),
            ("EMBEDDING_BACKEND", "Hashing"),
            ("EMBEDDING_CACHE_DIR", "/var/cache/models"),
            ("EMBEDDING_WARMUP", "true"),
            ("AI_COOLDOWN_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.embedding_backend, EmbeddingBackend::Hashing);
        assert_eq!(
            config.embedding_cache_dir,
            Some(PathBuf::from("/var/cache/models"))
        );
        assert!(config.embedding_warmup);
        assert_eq!(config.ai_cooldown, Duration::ZERO);
    }

    #[test]
    fn test_invalid_values_fail_with_context() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(config(&[("EMBEDDING_BACKEND", "openai")]).is_err());
        assert!(config(&[("AI_MAX_CONCURRENCY", "0")]).is_err());
        assert!(config(&[("RANKING_TOP_K", "0")]).is_err());
    }
}
