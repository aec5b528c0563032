//! Paygate server: HTTP front end for the payment-provider bridge.
//!
//! Reads the configuration named by `PAYGATE_CONFIG` (default
//! `paygate.toml`), resolves provider secrets from the environment and
//! serves one route per catalogue endpoint until SIGINT or SIGTERM.

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from axum, reqwest and wiremock"
)]

mod observability;
mod routes;

use std::process::ExitCode;

use paygate_bridge::{
    Gateway, GatewayError,
    config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, GatewayConfig},
};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::{
    observability::{LogFormat, init_observability},
    routes::{AppState, router},
};

/// Fatal start-up and serve errors.
#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_observability(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = GatewayConfig::from_file(&path)?;
    let gateway = Gateway::from_config(&config)?;

    let addr = config.server.bind.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    tracing::info!(%addr, config = %path, "http server listening");

    axum::serve(listener, router(AppState::new(gateway)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = wait_for_signal("ctrl-c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Completes when `signal` fires. A handler that cannot be installed never
/// completes, so the server keeps running on the remaining signal.
#[allow(clippy::impl_trait_in_params, reason = "single call site per signal source")]
async fn wait_for_signal(
    name: &str,
    signal: impl Future<Output = std::io::Result<()>>,
) {
    if let Err(error) = signal.await {
        tracing::warn!(%error, signal = name, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
}
