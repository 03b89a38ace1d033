//! Webhook server for the Meta Cloud API
//!
//! GET handles the verification handshake, POST receives message batches.
//! Batches fan out concurrently across senders; the handler acknowledges
//! with 200 once processing settles, whatever the per-message outcomes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::dispatch::ReplyDispatcher;
use crate::error::{Result, WhatsAppError};
use crate::graph::{GraphClient, InboundMessage, extract_messages, parse_webhook_payload};
use crate::survey::SurveyEngine;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub graph: Arc<GraphClient>,
    pub engine: Arc<SurveyEngine>,
    pub dispatcher: Arc<ReplyDispatcher>,
}

/// Webhook server
pub struct WebhookServer {
    addr: SocketAddr,
    state: WebhookState,
}

impl WebhookServer {
    /// Create a new webhook server
    pub fn new(
        addr: SocketAddr,
        graph: Arc<GraphClient>,
        engine: Arc<SurveyEngine>,
        dispatcher: Arc<ReplyDispatcher>,
    ) -> Self {
        let state = WebhookState {
            graph,
            engine,
            dispatcher,
        };

        Self { addr, state }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/webhook", get(verify_handler).post(receive_handler))
            .with_state(Arc::new(self.state.clone()))
    }

    /// Start the webhook server
    pub async fn start(self) -> Result<()> {
        info!("Starting WhatsApp webhook server on {}", self.addr);

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| WhatsAppError::Config(e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| WhatsAppError::Http(e.to_string()))?;

        Ok(())
    }
}

/// Query parameters of the Meta verification handshake
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Handle the webhook verification handshake (Meta -> GET)
async fn verify_handler(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let (Some(mode), Some(token), Some(challenge)) = (params.mode, params.token, params.challenge)
    else {
        warn!("Webhook verification request missing parameters");
        return (StatusCode::FORBIDDEN, String::new());
    };

    match state.graph.verify_webhook(&mode, &token, &challenge) {
        Ok(challenge) => (StatusCode::OK, challenge),
        Err(_) => (StatusCode::FORBIDDEN, String::new()),
    }
}

/// Handle incoming messages (Meta -> POST)
async fn receive_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    if state.graph.requires_signature() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !state.graph.verify_signature(body.as_bytes(), signature) {
            warn!("Rejecting webhook delivery with bad signature");
            return (StatusCode::FORBIDDEN, "");
        }
    }

    let payload = match parse_webhook_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed webhook payload: {}", e);
            return (StatusCode::NOT_FOUND, "");
        }
    };

    if payload.object.is_none() {
        return (StatusCode::NOT_FOUND, "");
    }

    let messages = extract_messages(&payload);
    debug!("Webhook delivery with {} message(s)", messages.len());

    // Fan out across the batch; replies for different senders have no
    // ordering guarantee.
    futures::future::join_all(
        messages
            .iter()
            .map(|message| process_message(&state, message)),
    )
    .await;

    // Always acknowledge quickly; redelivery is worse than a dropped reply.
    (StatusCode::OK, "")
}

/// Process a single inbound message
async fn process_message(state: &WebhookState, message: &InboundMessage) {
    info!("Message from {}: {:?}", message.from, message.body);

    match state.engine.advance(&message.from, &message.body).await {
        Ok(Some(advance)) => {
            state
                .dispatcher
                .send_reply(&message.from, &message.body, &advance.reply)
                .await;
        }
        Ok(None) => {
            debug!("Skipping message from {} (no reply)", message.from);
        }
        Err(e) => {
            error!("Error processing message from {}: {}", message.from, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::{ConversationStore, MessageLog, WhatsAppConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn send_mock() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.1"}]
            })))
            .mount(&server)
            .await;
        server
    }

    fn test_state(base_url: &str, app_secret: Option<&str>) -> (Arc<WebhookState>, Arc<ConversationStore>) {
        let graph = Arc::new(
            GraphClient::new(&WhatsAppConfig {
                verify_token: "shared-secret".to_string(),
                access_token: "token".to_string(),
                phone_number_id: "123".to_string(),
                app_secret: app_secret.map(String::from),
                graph_base_url: None,
                port: 3000,
            })
            .with_base_url(base_url.to_string()),
        );

        let store = Arc::new(ConversationStore::in_memory().unwrap());
        let engine = Arc::new(SurveyEngine::new(
            vec!["Q1?".to_string(), "Q2?".to_string()],
            "done",
            Arc::clone(&store),
        ));
        let log = Arc::new(MessageLog::in_memory().unwrap());
        let dispatcher = Arc::new(ReplyDispatcher::new(Arc::clone(&graph), log));

        (
            Arc::new(WebhookState {
                graph,
                engine,
                dispatcher,
            }),
            store,
        )
    }

    fn batch_payload() -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [
                            {"from": "15550001111", "text": {"body": "hello"}},
                            {"from": "15550002222", "text": {"body": "hey"}}
                        ]
                    }
                }]
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_handshake_echoes_challenge() {
        let server = send_mock().await;
        let (state, _) = test_state(&server.uri(), None);

        let response = verify_handler(
            State(state),
            Query(VerifyParams {
                mode: Some("subscribe".to_string()),
                token: Some("shared-secret".to_string()),
                challenge: Some("challenge-42".to_string()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handshake_rejects_bad_token() {
        let server = send_mock().await;
        let (state, _) = test_state(&server.uri(), None);

        let response = verify_handler(
            State(state),
            Query(VerifyParams {
                mode: Some("subscribe".to_string()),
                token: Some("wrong".to_string()),
                challenge: Some("c".to_string()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handshake_rejects_missing_params() {
        let server = send_mock().await;
        let (state, _) = test_state(&server.uri(), None);

        let response = verify_handler(
            State(state),
            Query(VerifyParams {
                mode: None,
                token: None,
                challenge: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_batch_is_processed_and_acknowledged() {
        let server = send_mock().await;
        let (state, store) = test_state(&server.uri(), None);

        let response = receive_handler(State(state), HeaderMap::new(), batch_payload())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        // Both senders got a conversation.
        assert!(store.get("15550001111").unwrap().is_some());
        assert!(store.get("15550002222").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let server = send_mock().await;
        let (state, store) = test_state(&server.uri(), None);

        let response = receive_handler(
            State(state),
            HeaderMap::new(),
            r#"{"entry": []}"#.to_string(),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.active_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_not_found() {
        let server = send_mock().await;
        let (state, _) = test_state(&server.uri(), None);

        let response = receive_handler(State(state), HeaderMap::new(), "not json".to_string())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_signature_is_forbidden() {
        let server = send_mock().await;
        let (state, store) = test_state(&server.uri(), Some("app-secret"));

        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", "sha256=deadbeef".parse().unwrap());

        let response = receive_handler(State(state), headers, batch_payload())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(store.active_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let server = send_mock().await;
        let (state, store) = test_state(&server.uri(), Some("app-secret"));

        let body = batch_payload();
        let mut mac = Hmac::<Sha256>::new_from_slice(b"app-secret").unwrap();
        mac.update(body.as_bytes());
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", signature.parse().unwrap());

        let response = receive_handler(State(state), headers, body)
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.active_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_send_failure_still_acknowledges() {
        // Graph API rejects every send; the webhook must still return 200.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let (state, store) = test_state(&server.uri(), None);

        let response = receive_handler(State(state), HeaderMap::new(), batch_payload())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        // State still advanced even though delivery failed.
        assert_eq!(store.active_count().unwrap(), 2);
    }
}
