use anyhow::Context;
use api::core::telemetry;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set variables directly.
    dotenvy::dotenv().ok();

    telemetry::init("info", Level::DEBUG).context("installing tracing subscriber")?;
    info!(version = env!("CARGO_PKG_VERSION"), "lab report backend starting");

    api::start().await.context("api server failed")?;

    Ok(())
}
