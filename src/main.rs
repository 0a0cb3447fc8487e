//! agent-relay: stateless HTTP relay for streaming LLM chat.
//!
//! Startup order matters: logging first, then `.env` + config, then the
//! provider credential check (fatal if missing), then the socket. The
//! persona and provider client are built once and shared read-only
//! across all requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use agent_relay::config::{Cli, Config};
use agent_relay::provider::openai::OpenAiCompatClient;
use agent_relay::relay::orchestrator::Orchestrator;
use agent_relay::repl;
use agent_relay::server::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "agent_relay=debug,tower_http=debug"
    } else {
        "agent_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("agent-relay v{}", env!("CARGO_PKG_VERSION"));

    // Pull secrets from .env if present; a real environment wins.
    let _ = dotenvy::dotenv();

    // Load configuration.
    let config = Config::load(&cli.config)?;
    let config = Arc::new(config);

    // Missing credential is fatal before anything is bound.
    let api_key = config.resolve_api_key()?;

    let persona = Arc::new(config.persona());
    info!(
        persona = persona.name,
        model = persona.model,
        base_url = config.provider.base_url,
        "Provider configured"
    );

    let provider = Arc::new(OpenAiCompatClient::new(&config.provider.base_url, api_key));
    let orchestrator = Orchestrator::new(
        provider,
        persona.clone(),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    if cli.repl {
        return repl::run(&orchestrator, &persona).await;
    }

    // Build application state.
    let state = Arc::new(AppState {
        orchestrator,
        config: config.clone(),
        start_time: Instant::now(),
    });

    // Build the HTTP router.
    let app = build_router(state)?;

    // Start the server.
    let listen_addr = cli.listen;
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
