//! WhatsApp Cloud (Graph) API client
//!
//! Sends text messages, answers the Meta webhook verification handshake and
//! checks `X-Hub-Signature-256` payload signatures.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use cg_core::WhatsAppConfig;

use crate::error::{Result, WhatsAppError};

/// Graph API base URL
const GRAPH_API_URL: &str = "https://graph.facebook.com/v21.0";

/// WhatsApp Cloud API client
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    phone_number_id: String,
    access_token: String,
    verify_token: String,
    app_secret: Option<String>,
    base_url: String,
}

impl GraphClient {
    /// Create a new Graph API client
    pub fn new(config: &WhatsAppConfig) -> Self {
        let base_url = match &config.graph_base_url {
            Some(url) => url.clone(),
            None => GRAPH_API_URL.to_string(),
        };

        Self {
            client: Client::new(),
            phone_number_id: config.phone_number_id.clone(),
            access_token: config.access_token.clone(),
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
            base_url,
        }
    }

    /// Override the base URL (for testing or custom endpoints)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Send a WhatsApp text message, returning the provider message id
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);

        let payload = SendMessagePayload {
            messaging_product: "whatsapp",
            to,
            text: TextBody { body },
        };

        debug!("Sending WhatsApp message to {}", to);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Graph API error: {} - {}", status, text);
            return Err(WhatsAppError::Api(format!("{} - {}", status, text)));
        }

        let result: SendMessageResponse = response.json().await?;
        let message_id = result
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .unwrap_or_default();

        info!("Message sent to {}: {}", to, message_id);
        Ok(message_id)
    }

    /// Verify the webhook challenge for the Meta webhook handshake
    pub fn verify_webhook(&self, mode: &str, token: &str, challenge: &str) -> Result<String> {
        if mode == "subscribe" && token == self.verify_token {
            info!("Webhook verified successfully");
            Ok(challenge.to_string())
        } else {
            error!("Webhook verification failed: invalid mode or token");
            Err(WhatsAppError::VerificationFailed)
        }
    }

    /// Whether payload signatures should be enforced
    pub fn requires_signature(&self) -> bool {
        self.app_secret.is_some()
    }

    /// Verify an `X-Hub-Signature-256` header against the raw payload.
    ///
    /// The header carries `sha256=<hex>` where the digest is HMAC-SHA256 of
    /// the payload keyed with the app secret. Returns false when no app
    /// secret is configured.
    pub fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let Some(secret) = &self.app_secret else {
            return false;
        };

        let hex_digest = match signature.strip_prefix("sha256=") {
            Some(rest) => rest,
            None => return false,
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(payload);

        let expected = hex::encode(mac.finalize().into_bytes());
        expected == hex_digest
    }
}

// =============================================================================
// Wire types for the Cloud API
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    messaging_product: &'a str,
    to: &'a str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessageId>,
}

#[derive(Debug, Deserialize)]
struct SentMessageId {
    id: String,
}

/// Webhook notification payload
///
/// Every level is optional; Meta sends many event shapes on the same topic
/// and only some carry messages.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub field: Option<String>,
    pub value: Option<WebhookValue>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    pub messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: Option<String>,
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub text: Option<WebhookText>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: Option<String>,
}

/// One extracted inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
}

/// Parse a raw webhook body
pub fn parse_webhook_payload(body: &str) -> Result<WebhookPayload> {
    serde_json::from_str(body).map_err(|e| WhatsAppError::InvalidPayload(e.to_string()))
}

/// Flatten a webhook payload into its inbound messages.
///
/// A webhook delivery can batch several message events across entries and
/// changes; messages without a sender are dropped, messages without a text
/// body yield an empty body.
pub fn extract_messages(payload: &WebhookPayload) -> Vec<InboundMessage> {
    let mut messages = Vec::new();

    for entry in payload.entry.iter().flatten() {
        for change in entry.changes.iter().flatten() {
            let Some(value) = &change.value else { continue };
            for message in value.messages.iter().flatten() {
                let Some(from) = &message.from else { continue };
                let body = message
                    .text
                    .as_ref()
                    .and_then(|t| t.body.clone())
                    .unwrap_or_default();
                messages.push(InboundMessage {
                    from: from.clone(),
                    body,
                });
            }
        }
    }

    messages
}
