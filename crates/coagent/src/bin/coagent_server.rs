//! Run the coagent runtime server with scripted engines.
//!
//! Usage: cargo run --bin coagent-server

use std::sync::Arc;

use coagent::{AgentRegistry, Bus, RuntimeConfig, Server};
use coagent_engine::{EngineKind, EngineSet, ScriptedEngine};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RuntimeConfig::from_env();
    let engines = EngineSet::new()
        .with(Arc::new(ScriptedEngine::echo(EngineKind::Claude)))
        .with(Arc::new(ScriptedEngine::echo(EngineKind::Codex)));
    let bus = Bus::new(config.event_capacity);
    let registry = AgentRegistry::new(engines, bus, config.clone());

    let mut server = match Server::start(registry, config.bind_addr).await {
        Ok(server) => server,
        Err(error) => {
            tracing::error!(addr = %config.bind_addr, "failed to start server: {error}");
            std::process::exit(1);
        }
    };
    tracing::info!("ws://{}/ws ready, events at http://{}/events", server.addr(), server.addr());

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {error}");
    }
    tracing::info!("shutting down");
    if let Err(error) = server.shutdown() {
        tracing::warn!("{error}");
    }
    server.join().await;
}
