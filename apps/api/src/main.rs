mod config;
mod db;
mod errors;
mod evaluation;
mod llm_client;
mod models;
mod results;
mod routes;
mod state;
mod transcript;
mod webhook;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::response::{IntoResponse, Response};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::errors::AppError;
use crate::evaluation::evaluator::Evaluator;
use crate::evaluation::scorer::{LlmScorer, QaScorer};
use crate::llm_client::LlmClient;
use crate::results::mirror::{ResultMirror, S3Mirror};
use crate::results::sink::ResultSink;
use crate::results::store::{PgResultStore, ResultStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Viva API v{}", env!("CARGO_PKG_VERSION"));

    let store: Option<Arc<dyn ResultStore>> = match &config.database_url {
        Some(url) => Some(Arc::new(PgResultStore::new(create_pool(url)?))),
        None => {
            warn!("DATABASE_URL not set; results will not be persisted");
            None
        }
    };

    let mirror: Option<Arc<dyn ResultMirror>> = match &config.s3 {
        Some(s3) => {
            info!("Mirroring results to bucket {}", s3.bucket);
            Some(Arc::new(S3Mirror::from_config(s3).await))
        }
        None => None,
    };

    let primary: Option<Arc<dyn QaScorer>> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!(
                "LLM scorer enabled (model: {}, falls back after {:?})",
                llm_client::MODEL,
                llm_client::worst_case_latency()
            );
            Some(Arc::new(LlmScorer(llm)))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; using heuristic scoring");
            None
        }
    };

    let state = AppState {
        evaluator: Evaluator::new(primary, config.max_marks_per_question),
        sink: ResultSink::new(store, mirror),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Turns a handler panic into the generic 500 body so the platform retries.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Internal(anyhow::anyhow!("Handler panicked: {detail}")).into_response()
}
