//! ClinOmics Web Server
//!
//! Run with: cargo run -p clinomics-web

use anyhow::Context;
use clinomics_web::{bootstrap::init_tracing, config::Config, router::build_router, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(&config.logging.level);

    let config_path = Config::path();
    if config_path.exists() {
        info!("Loaded config from {}", config_path.display());
    } else {
        info!("No config at {}, using defaults", config_path.display());
    }

    info!("Starting ClinOmics Web Server...");
    let state = AppState::from_config(&config).await?;
    let sources: Vec<&str> = state
        .driver
        .aggregator()
        .sources()
        .into_iter()
        .map(|(_, adapter)| adapter)
        .collect();
    info!(?sources, require_login = config.accounts.require_login, "Sources configured");

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Cannot bind {}", config.server.bind))?;
    info!("Server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
