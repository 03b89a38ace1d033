//! Dashboard server configuration and startup

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tracing::info;

use cg_core::DashboardConfig;

use crate::api::{CampaignProvider, DashboardState, create_router};
use crate::error::{DashboardError, Result};

/// Dashboard server
pub struct DashboardServer {
    config: DashboardConfig,
    state: DashboardState,
}

impl DashboardServer {
    /// Create a new dashboard server
    pub fn new(config: DashboardConfig, campaigns: Arc<dyn CampaignProvider + Send + Sync>) -> Self {
        Self {
            config,
            state: DashboardState::new(campaigns),
        }
    }

    /// Get the router
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Get the socket address
    fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        addr.parse()
            .map_err(|e| DashboardError::ConfigError(format!("Invalid address: {}", e)))
    }

    /// Start the server
    pub async fn run(self) -> Result<()> {
        let addr = self.socket_addr()?;
        let app = self.router();

        info!("Dashboard server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| DashboardError::ServerError(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| DashboardError::ServerError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cg_core::CampaignRecord;

    struct EmptyProvider;

    #[async_trait]
    impl CampaignProvider for EmptyProvider {
        async fn list_campaigns(&self, _limit: usize) -> Vec<CampaignRecord> {
            vec![]
        }

        async fn get_campaign(&self, _id: &str) -> Option<CampaignRecord> {
            None
        }
    }

    #[test]
    fn test_socket_addr() {
        let server = DashboardServer::new(
            DashboardConfig {
                host: "127.0.0.1".to_string(),
                port: 9090,
            },
            Arc::new(EmptyProvider),
        );
        assert_eq!(server.socket_addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let server = DashboardServer::new(
            DashboardConfig {
                host: "not a host".to_string(),
                port: 9090,
            },
            Arc::new(EmptyProvider),
        );
        assert!(matches!(
            server.socket_addr(),
            Err(DashboardError::ConfigError(_))
        ));
    }
}
