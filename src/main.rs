//! Activity fusion service binary.
//! Loads config, builds the engine and serves the axum router.

use anyhow::Context;
use tracing::info;

use activity_fusion::{create_router, telemetry, AppState, FusionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let cfg = FusionConfig::load().context("loading fusion config")?;
    let state = AppState::from_config(&cfg).context("building fusion engine")?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    info!(target: "api", bind = %cfg.server.bind, "activity-fusion listening");

    axum::serve(listener, router).await?;
    Ok(())
}
