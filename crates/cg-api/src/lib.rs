//! cg-api: HTTP API for campaign-gateway
//!
//! Exposes the campaign generation endpoint. Built with axum for async
//! HTTP handling.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::start_server;
