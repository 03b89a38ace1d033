//! cg-dashboard: Web dashboard for campaign-gateway
//!
//! Read-only view over generated campaign records with a flattened CSV
//! export.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cg_dashboard::{CampaignProvider, DashboardServer};
//! use cg_core::DashboardConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DashboardConfig::default();
//!     let campaigns = Arc::new(MyCampaignProvider);
//!
//!     let server = DashboardServer::new(config, campaigns);
//!     server.run().await.unwrap();
//! }
//! ```

pub mod api;
pub mod error;
pub mod export;
pub mod server;

pub use api::{CampaignProvider, DashboardState};
pub use error::{DashboardError, Result};
pub use export::{campaign_rows, export_csv, to_csv};
pub use server::DashboardServer;
