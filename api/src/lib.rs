//! HTTP surface of the lab report backend.

use std::{env, sync::Arc};

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use tokio::signal;
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    middleware_layer::json_extractor::json_error_mapper,
};

const DEFAULT_ADDRESS: &str = "0.0.0.0:7000";

/// Full router with shared state applied.
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.limits.max_body_bytes;
    Router::new()
        .route("/", get(liveness))
        .nest("/api/reports", routes::reports::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

async fn liveness() -> &'static str {
    "Lab report API is running"
}

/// Builds state from the environment and serves until Ctrl+C.
pub async fn start() -> AppResult<()> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
    let state = Arc::new(AppState::from_env().await?);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server runs until killed.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
