mod analysis;
mod config;
mod db;
mod errors;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::agent::AgentCrew;
use crate::analysis::extractor::SkillExtractor;
use crate::analysis::models::{CancelSignal, RunOptions};
use crate::analysis::orchestrator::{
    AgenticAnalyzer, AnalysisStrategy, DeterministicAnalyzer, Orchestrator,
};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Affinity API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Deterministic strategy: always available
    let extractor = Arc::new(SkillExtractor::new(&config.skill_vocabulary)?);
    info!(
        vocabulary_size = extractor.vocabulary().count(),
        "Skill extractor initialized"
    );
    let deterministic: Arc<dyn AnalysisStrategy> =
        Arc::new(DeterministicAnalyzer::new(extractor));

    // Agentic strategy: only when an inference backend is configured
    let agentic: Option<Arc<dyn AnalysisStrategy>> = match &config.llm {
        Some(llm_config) => {
            let llm = LlmClient::new(llm_config)?;
            info!(model = llm.model(), "LLM client initialized");
            Some(Arc::new(AgenticAnalyzer::new(AgentCrew::new(Arc::new(llm)))))
        }
        None => {
            info!("GROQ_API_KEY not set; agentic strategy disabled");
            None
        }
    };

    // In-flight agent stages are cancelled once shutdown starts
    let (shutdown_tx, shutdown) = CancelSignal::new();
    let default_options = RunOptions {
        stage_timeout: Some(config.stage_timeout),
        cancel: Some(shutdown),
    };

    let orchestrator = Orchestrator::new(
        deterministic,
        agentic,
        config.default_strategy,
        default_options,
    )?;
    info!(
        default_strategy = orchestrator.default_strategy().as_str(),
        stage_timeout_secs = config.stage_timeout.as_secs(),
        "Analysis orchestrator ready"
    );

    // Build app state
    let state = AppState {
        db,
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        // TODO: restrict CORS origins once the frontend host is fixed
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = cancel_tx.send(true);
}
