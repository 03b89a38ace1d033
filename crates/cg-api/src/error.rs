//! Error types for cg-api

use thiserror::Error;

/// cg-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] cg_core::Error),

    #[error("Marketing error: {0}")]
    Marketing(#[from] cg_marketing::MarketingError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
