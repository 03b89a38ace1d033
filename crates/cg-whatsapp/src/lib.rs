//! cg-whatsapp: WhatsApp survey bot for campaign-gateway
//!
//! Receives messages through the Meta Cloud API webhook, walks each sender
//! through a fixed question sequence and archives the finished answers.

pub mod bot;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod survey;
pub mod webhook;

pub use bot::WhatsAppBot;
pub use dispatch::ReplyDispatcher;
pub use error::{Result, WhatsAppError};
pub use graph::{GraphClient, InboundMessage, WebhookPayload, extract_messages, parse_webhook_payload};
pub use survey::{Advance, SurveyEngine};
pub use webhook::WebhookServer;
