//! WhatsApp bot wrapper

use std::net::SocketAddr;
use std::sync::Arc;

use cg_core::{Config, ConversationStore, MessageLog};

use crate::dispatch::ReplyDispatcher;
use crate::error::Result;
use crate::graph::GraphClient;
use crate::survey::SurveyEngine;
use crate::webhook::WebhookServer;

/// WhatsApp bot wrapper
///
/// Wires the Graph client, the survey engine and the dispatcher together
/// and runs the webhook server.
pub struct WhatsAppBot {
    graph: Arc<GraphClient>,
    engine: Arc<SurveyEngine>,
    dispatcher: Arc<ReplyDispatcher>,
    port: u16,
}

impl WhatsAppBot {
    /// Create a new WhatsApp bot from configuration and shared stores
    pub fn new(
        config: &Config,
        conversations: Arc<ConversationStore>,
        message_log: Arc<MessageLog>,
    ) -> Self {
        let graph = Arc::new(GraphClient::new(&config.whatsapp));
        let engine = Arc::new(SurveyEngine::new(
            config.survey.questions.clone(),
            config.survey.completion_message.clone(),
            conversations,
        ));
        let dispatcher = Arc::new(ReplyDispatcher::new(Arc::clone(&graph), message_log));

        Self {
            graph,
            engine,
            dispatcher,
            port: config.whatsapp.port,
        }
    }

    /// Start the bot (webhook server)
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let server = WebhookServer::new(addr, self.graph, self.engine, self.dispatcher);

        server.start().await
    }

    /// Get the Graph client for direct use
    pub fn graph_client(&self) -> Arc<GraphClient> {
        Arc::clone(&self.graph)
    }
}
