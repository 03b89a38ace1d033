//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use cg_marketing::CampaignGenerator;

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<CampaignGenerator>,
}

/// Start the HTTP API server
pub async fn start_server(port: u16, generator: Arc<CampaignGenerator>) -> anyhow::Result<()> {
    let state = AppState { generator };

    let app = Router::new()
        .merge(routes())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
