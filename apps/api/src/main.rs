mod ai;
mod config;
mod embedding;
mod errors;
mod models;
mod ranking;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::{AiManager, Cooldown};
use crate::config::{Config, EmbeddingBackend};
use crate::embedding::{fastembed::parse_model_name, Embedder, FastEmbedder, HashingEmbedder};
use crate::ranking::RankingEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting candidate ranker v{}", env!("CARGO_PKG_VERSION"));

    let embedder = build_embedder(&config).await?;
    info!(
        model = embedder.model_name(),
        dimensions = embedder.dimensions(),
        top_k = config.ranking_top_k,
        "Embedding engine initialized"
    );
    let ranking = RankingEngine::new(embedder, config.ranking_top_k);

    let http = ai::providers::build_http_client(config.ai_call_timeout)
        .context("Failed to build HTTP client for AI providers")?;
    let ai = Arc::new(AiManager::new(
        Cooldown::new(config.ai_cooldown),
        config.ai_max_concurrency,
        config.ai_call_timeout,
        http,
    ));
    info!(
        cooldown_secs = config.ai_cooldown.as_secs(),
        max_concurrency = config.ai_max_concurrency,
        "AI manager initialized (no provider configured)"
    );

    let state = AppState {
        ranking,
        ai,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the configured embedder. With `EMBEDDING_WARMUP` the model loads now instead of on the
/// first request; a failed warm-up is logged and retried on first use.
async fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding_backend {
        EmbeddingBackend::Hashing => {
            warn!("Using the lexical hashing embedder; scores are keyword-based, not semantic");
            Ok(Arc::new(HashingEmbedder::default()))
        }
        EmbeddingBackend::FastEmbed => {
            let embedder = Arc::new(FastEmbedder::new(
                parse_model_name(&config.embedding_model),
                config.embedding_cache_dir.clone(),
            ));

            if config.embedding_warmup {
                let warm = embedder.clone();
                match tokio::task::spawn_blocking(move || warm.warm_up())
                    .await
                    .context("embedding warm-up task failed")?
                {
                    Ok(()) => info!("Embedding model warmed up"),
                    Err(e) => warn!("Embedding warm-up failed, will retry on first request: {e}"),
                }
            }

            Ok(embedder as Arc<dyn Embedder>)
        }
    }
}
