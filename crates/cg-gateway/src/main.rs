//! cg-gateway: Campaign Gateway Main Binary
//!
//! Main entry point for the campaign-gateway application.
//!
//! Usage:
//!   cg-gateway           - Start server mode (webhook + API + dashboard)
//!   cg-gateway --help    - Show help
//!   cg-gateway --version - Show version

mod providers;

use std::sync::Arc;

use cg_core::{CampaignStore, Config, ConversationStore, GeminiClient, MessageLog};
use cg_dashboard::DashboardServer;
use cg_marketing::CampaignGenerator;
use cg_whatsapp::WhatsAppBot;
use tracing_subscriber::EnvFilter;

use providers::StoreCampaignProvider;

/// Run mode
enum RunMode {
    /// Server mode (webhook + HTTP API + dashboard)
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("cg-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting cg-gateway...");
    tracing::info!("Model: {}", config.gemini.model);

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("cg-gateway - Campaign Gateway");
    println!();
    println!("Usage:");
    println!("  cg-gateway           Start server mode (webhook + API + dashboard)");
    println!("  cg-gateway --help    Show this help message");
    println!("  cg-gateway --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  WHATSAPP_VERIFY_TOKEN    Webhook handshake secret (required)");
    println!("  WHATSAPP_ACCESS_TOKEN    Graph API bearer token (required)");
    println!("  WHATSAPP_PHONE_NUMBER_ID Sending phone number id (required)");
    println!("  WHATSAPP_APP_SECRET      App secret for payload signatures");
    println!("  WEBHOOK_PORT             Webhook server port (default: 3000)");
    println!("  GEMINI_API_KEY           Gemini API key (required)");
    println!("  GEMINI_MODEL             Model name (default: gemini-2.5-flash)");
    println!("  API_PORT                 HTTP API port (default: 4000)");
    println!("  DASHBOARD_PORT           Dashboard port (default: 8080)");
    println!("  DB_PATH                  SQLite database path");
}

/// Run server mode (webhook + HTTP API + dashboard)
async fn run_server(config: Config) -> anyhow::Result<()> {
    // Make sure the database directory exists before the stores open it.
    if let Some(parent) = std::path::Path::new(&config.storage.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_path = &config.storage.db_path;
    let conversations = Arc::new(
        ConversationStore::new(db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open conversation store: {}", e))?,
    );
    let message_log = Arc::new(
        MessageLog::new(db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open message log: {}", e))?,
    );
    let campaigns = Arc::new(
        CampaignStore::new(db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open campaign store: {}", e))?,
    );

    let gemini = Arc::new(
        GeminiClient::new(&config.gemini)
            .map_err(|e| anyhow::anyhow!("Failed to create Gemini client: {}", e))?,
    );
    let generator = Arc::new(CampaignGenerator::new(gemini, Arc::clone(&campaigns)));

    // Track running services for shutdown
    let mut service_handles = Vec::new();

    // Webhook bot
    let bot = WhatsAppBot::new(&config, conversations, message_log);
    let handle = tokio::spawn(async move {
        if let Err(e) = bot.start().await {
            tracing::error!("Webhook server error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("WhatsApp webhook server started on port {}", config.whatsapp.port);

    // HTTP API server
    let api_port = config.api.port;
    let api_generator = Arc::clone(&generator);
    let handle = tokio::spawn(async move {
        if let Err(e) = cg_api::start_server(api_port, api_generator).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("HTTP API server started on port {}", api_port);

    // Dashboard server
    let dashboard = DashboardServer::new(
        config.dashboard.clone(),
        Arc::new(StoreCampaignProvider::new(Arc::clone(&campaigns))),
    );
    let dashboard_port = config.dashboard.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = dashboard.run().await {
            tracing::error!("Dashboard error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("Dashboard started on port {}", dashboard_port);

    tracing::info!("cg-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
