//! cg-core: Campaign Gateway Core Library
//!
//! Shared configuration, error types, the Gemini client and the SQLite
//! stores used by the webhook bot and the campaign generator.

pub mod config;
pub mod error;
pub mod llm;
pub mod storage;

pub use config::{
    ApiConfig, Config, DashboardConfig, GeminiConfig, StorageConfig, SurveyConfig, WhatsAppConfig,
};
pub use error::{Error, Result};
pub use llm::GeminiClient;
pub use storage::{
    CampaignRecord, CampaignStore, CompletedResponse, ConversationState, ConversationStore,
    MessageLog, MessageLogEntry, Timeframe,
};
