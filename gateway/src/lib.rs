pub mod api;
pub mod config;
pub mod config_client;
pub mod errors;
pub mod locator;
pub mod log_client;
pub mod metrics_defs;
pub mod normalize;
pub mod types;
mod upstream;

#[cfg(test)]
mod testutils;

use config::{Config, ValidationError};
use errors::UpstreamError;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("upstream client error: {0}")]
    Upstream(#[from] UpstreamError),
}

pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;

    let state = api::AppState::from_config(&config)?;
    let app = api::router(state);

    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        environment = %config.environment,
        config_upstream = %config.config_upstream.url,
        log_upstream = %config.log_upstream.url,
        "Drone gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Drone gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
