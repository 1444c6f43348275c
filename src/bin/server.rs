//! HTTP server for the conversational data room API.

use anyhow::Result;
use clap::Parser;
use dataroom::api::{self, AppState};
use dataroom::config::Settings;
use dataroom::engine::PolarsEngine;
use dataroom::llm::LlmClient;
use dataroom::pipeline::ChatPipeline;
use dataroom::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dataroom")]
#[command(about = "Conversational data analysis server")]
struct Args {
    /// Address to bind, e.g. 0.0.0.0:8000 (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// OpenAI-compatible API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = api_key;
    }

    if settings.api_key.is_empty() {
        warn!("No API key configured; chat turns will fail until OPENAI_API_KEY is set");
    }

    let llm = Arc::new(LlmClient::new(
        settings.api_key.clone(),
        settings.model.clone(),
        settings.base_url.clone(),
        Duration::from_secs(settings.llm_timeout_secs),
    ));
    let store = Arc::new(SessionStore::new());
    let pipeline = Arc::new(ChatPipeline::new(
        Arc::clone(&store),
        llm,
        Arc::new(PolarsEngine),
        &settings,
    ));

    let state = AppState {
        store,
        pipeline,
        settings: Arc::new(settings.clone()),
    };

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Data room API listening on {}", settings.bind_addr);
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
