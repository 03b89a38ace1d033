//! Survey progression engine
//!
//! Advances one sender's conversation by exactly one step per inbound
//! message, over an injected, immutable question sequence. Transitions for
//! the same sender are serialized through a per-sender async mutex; the
//! store additionally rejects updates whose expected step went stale.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use cg_core::ConversationStore;

use crate::error::Result;

/// Outcome of processing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// Text to send back to the sender
    pub reply: String,
    /// True when this message finished the survey
    pub completed: bool,
}

/// Conversation progression engine
pub struct SurveyEngine {
    questions: Arc<Vec<String>>,
    completion_message: String,
    store: Arc<ConversationStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SurveyEngine {
    /// Create an engine over a fixed question sequence.
    ///
    /// The sequence must not be empty.
    pub fn new(
        questions: Vec<String>,
        completion_message: impl Into<String>,
        store: Arc<ConversationStore>,
    ) -> Self {
        assert!(!questions.is_empty(), "question sequence must not be empty");
        Self {
            questions: Arc::new(questions),
            completion_message: completion_message.into(),
            store,
            locks: DashMap::new(),
        }
    }

    /// Number of questions in the sequence
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Process one inbound message for a sender.
    ///
    /// Returns `None` for empty messages (no state change, no reply).
    /// Otherwise returns the reply to dispatch and whether the survey
    /// finished. The first message from an unseen sender only creates the
    /// conversation; its text is not recorded as an answer.
    pub async fn advance(&self, sender_id: &str, incoming: &str) -> Result<Option<Advance>> {
        let body = incoming.trim();
        if body.is_empty() {
            debug!("Ignoring empty message from {}", sender_id);
            return Ok(None);
        }

        // Serialize same-sender transitions; different senders proceed
        // concurrently.
        let lock = {
            let entry = self
                .locks
                .entry(sender_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        match self.store.get(sender_id)? {
            None => {
                self.store.create(sender_id)?;
                Ok(Some(Advance {
                    reply: self.questions[0].clone(),
                    completed: false,
                }))
            }
            Some(state) => {
                let updated = self.store.record_answer(sender_id, state.current_step, body)?;

                if (updated.current_step as usize) < self.questions.len() {
                    Ok(Some(Advance {
                        reply: self.questions[updated.current_step as usize].clone(),
                        completed: false,
                    }))
                } else {
                    self.store.complete(&updated)?;
                    Ok(Some(Advance {
                        reply: self.completion_message.clone(),
                        completed: true,
                    }))
                }
            }
        }
    }
}
