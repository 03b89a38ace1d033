//! Outbound reply dispatch
//!
//! Delivery is best-effort by policy: the inbound webhook is acknowledged
//! before (and regardless of whether) the outbound send completes, so a
//! Graph API outage never triggers provider-side redelivery storms.

use std::sync::Arc;

use tracing::{error, info};

use cg_core::MessageLog;

use crate::graph::GraphClient;

/// Best-effort reply dispatcher
pub struct ReplyDispatcher {
    graph: Arc<GraphClient>,
    log: Arc<MessageLog>,
}

impl ReplyDispatcher {
    /// Create a new dispatcher
    pub fn new(graph: Arc<GraphClient>, log: Arc<MessageLog>) -> Self {
        Self { graph, log }
    }

    /// Send a reply and record the exchange.
    ///
    /// Failures (authorization, network) are logged and swallowed; the
    /// message log only records replies that were actually delivered.
    pub async fn send_reply(&self, to: &str, inbound: &str, reply: &str) {
        match self.graph.send_message(to, reply).await {
            Ok(message_id) => {
                info!("Reply sent to {} ({})", to, message_id);
                if let Err(e) = self.log.append(to, inbound, reply) {
                    error!("Failed to record message log entry for {}: {}", to, e);
                }
            }
            Err(e) => {
                error!("Failed to send reply to {}: {}", to, e);
            }
        }
    }
}
