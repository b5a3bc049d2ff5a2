//! Signal Hub - Main Entry Point

use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use signal_hub::config::Config;
use signal_hub::engine::Engine;
use signal_hub::lifecycle::{shutdown, supervisor};
use signal_hub::transport::WebSocketTransport;
use signal_hub::ws::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "signal_hub=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting signal hub");

    let transport = WebSocketTransport::new();
    let engine = Engine::new(config.clone(), transport.clone());
    shutdown::install_panic_hook(engine.clone());

    let (sweep_handle, log_handle) = supervisor::spawn(engine.clone());

    let cors = if config.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let state = AppState { engine: engine.clone(), transport };
    let app = Router::new()
        .route("/ws", get(ws::handler))
        .route("/healthz", get(ws::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "server listening");

    let serve_handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
    });

    let signal_name = shutdown::wait_for_signal().await;
    shutdown::graceful_shutdown(engine, signal_name).await;

    sweep_handle.abort();
    log_handle.abort();
    serve_handle.abort();

    info!("server shutdown complete");
    Ok(())
}
