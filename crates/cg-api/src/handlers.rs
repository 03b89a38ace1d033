//! HTTP API handlers
//!
//! Request handlers for campaign generation.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use cg_core::{CampaignRecord, Timeframe};
use cg_marketing::GenerateCampaign;

use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Campaign generation request payload
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Free-text campaign prompt
    pub prompt: String,
    /// Planning horizon
    #[serde(default)]
    pub timeframe: Timeframe,
    /// Target channels
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Requesting user
    #[serde(rename = "userId")]
    pub user_id: String,
}

fn default_channels() -> Vec<String> {
    vec![
        "google_ads".to_string(),
        "instagram".to_string(),
        "facebook".to_string(),
    ]
}

/// Structured generation response envelope
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CampaignRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn ok(record: CampaignRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Generate a marketing campaign
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> (StatusCode, Json<GenerateResponse>) {
    debug!("Generate request from user {}", req.user_id);

    let request = GenerateCampaign {
        prompt: req.prompt,
        timeframe: req.timeframe,
        channels: req.channels,
        user_id: req.user_id,
    };

    match state.generator.generate(request).await {
        Ok(record) => {
            info!("Campaign {} generated", record.id);
            (StatusCode::OK, Json(GenerateResponse::ok(record)))
        }
        Err(e) => {
            // Log the detail, return a generic message to the caller.
            error!("Campaign generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateResponse::err("Failed to generate campaign")),
            )
        }
    }
}
