//! TalentMatch Engine - Main Entry Point
//! JSON-RPC server + semantic scorer supervisor with lexical fallback

mod settings;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use talentmatch_api_rpc::RpcServer;
use talentmatch_core::application::{MatchOrchestrator, ScorerSupervisor};
use talentmatch_core::lexical::LexicalMatcher;
use talentmatch_core::port::time_provider::SystemTimeProvider;
use talentmatch_infra_system::ProcessScorerLauncher;

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("TALENTMATCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("talentmatch=info"))?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    init_logging()?;
    info!("TalentMatch Engine v{} starting...", talentmatch_core::VERSION);

    // 2. Load configuration
    let config_path = settings::config_path();
    info!(config_path = %config_path, "Loading configuration...");
    let config = settings::load_engine_config()?;
    let rpc_config = settings::rpc_config()?;

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let launcher = Arc::new(ProcessScorerLauncher::new(config.scorer.clone()));
    let supervisor = Arc::new(ScorerSupervisor::new(
        launcher,
        config.scorer.clone(),
        time_provider,
    ));
    let lexical = Arc::new(LexicalMatcher::from_config(&config)?);
    let orchestrator = Arc::new(MatchOrchestrator::new(
        supervisor.clone(),
        lexical,
        config.matching,
    ));

    // 4. Kick off the scorer in the background; matching works meanwhile
    supervisor.start();
    let settle_wait = Duration::from_millis(config.scorer.startup_timeout_ms) + Duration::from_secs(1);
    let watcher = supervisor.clone();
    tokio::spawn(async move {
        let state = watcher.wait_until_settled(settle_wait).await;
        info!(scorer_state = %state, "Semantic scorer start attempt settled");
    });

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_server = RpcServer::new(rpc_config, orchestrator);
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!("System ready. Waiting for match requests...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    supervisor.shutdown().await;

    info!("Shutdown complete.");

    Ok(())
}
