//! roomcast-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints and closes
//! every session on SIGINT/SIGTERM.

use tokio::signal;
use tracing_subscriber::EnvFilter;

use roomcast_gateway::api;
use roomcast_gateway::app_state::AppState;
use roomcast_gateway::config::GatewayConfig;
use roomcast_gateway::service::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, rooms = ?config.rooms, "starting roomcast-gateway");

    // Build engine, dispatcher and router
    let app_state = AppState::from_config(&config);
    let dispatcher = app_state.dispatcher.clone();
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dispatcher))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Waits for SIGINT or SIGTERM, then closes every chat session so the
/// server can drain.
async fn shutdown_signal(dispatcher: Dispatcher) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    let closed = dispatcher.shutdown().await;
    tracing::info!(closed, "all sessions closed");
}
