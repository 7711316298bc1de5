use std::{net::SocketAddr, sync::Arc};

use llm_core::{LlmClient, LlmConfig, StyleScriptWriter};
use server::{app, config::ServerConfig, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tts_core::{GoogleTtsClient, SpeechOrchestrator, TtsConfig, VoiceCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting voice studio server...");

    let config = ServerConfig::from_env();
    let tts_config = TtsConfig::from_env();
    if !tts_config.is_configured() {
        warn!("GOOGLE_API_KEY not set; generation requests will fail with a configuration error");
    }

    let api = Arc::new(GoogleTtsClient::new(&tts_config)?);
    let mut orchestrator = SpeechOrchestrator::new(api);

    let llm_config = LlmConfig::from_env();
    if llm_config.is_configured() {
        let client = LlmClient::new(&llm_config)?;
        info!(provider = ?client.provider(), model = %client.model(), "style scripting enabled");
        let writer = StyleScriptWriter::new(Arc::new(client), llm_config.script_cache_size);
        orchestrator = orchestrator.with_style_scripter(Arc::new(writer));
    } else {
        warn!("no LLM key configured; style instructions are disabled");
    }

    let catalog = VoiceCatalog::default();
    info!("Loaded {} voices", catalog.len());

    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, request_timeout={}s",
        config.port, config.rate_limit_per_minute, config.request_timeout_secs
    );
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let router = app(AppState::new(orchestrator, catalog, tts_config, config));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
