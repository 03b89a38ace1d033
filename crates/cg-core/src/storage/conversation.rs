//! Conversation state storage
//!
//! One row per active sender. The step update is conditional on the
//! expected prior step, so two writers racing on the same sender cannot
//! both apply the same transition.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Progress of one sender through the question sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Opaque external identifier (phone number)
    pub sender_id: String,
    /// Index of the question the sender is currently answering
    pub current_step: u32,
    /// Recorded answers, ordered by step index
    pub answers: Vec<String>,
}

/// Archived answers of a finished conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedResponse {
    pub sender_id: String,
    pub answers: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// SQLite-backed store for conversation state
pub struct ConversationStore {
    conn: Mutex<Connection>,
}

impl ConversationStore {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening conversation database at: {}", db_path);
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                sender_id TEXT PRIMARY KEY,
                current_step INTEGER NOT NULL,
                answers TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS completed_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id TEXT NOT NULL,
                answers TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Load the active conversation for a sender
    pub fn get(&self, sender_id: &str) -> Result<Option<ConversationState>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sender_id, current_step, answers FROM conversations WHERE sender_id = ?1",
        )?;

        let result = stmt.query_row(params![sender_id], |row| {
            let sender_id: String = row.get(0)?;
            let current_step: u32 = row.get(1)?;
            let answers_json: String = row.get(2)?;
            Ok((sender_id, current_step, answers_json))
        });

        match result {
            Ok((sender_id, current_step, answers_json)) => {
                let answers: Vec<String> = serde_json::from_str(&answers_json)?;
                Ok(Some(ConversationState {
                    sender_id,
                    current_step,
                    answers,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a fresh conversation at step 0.
    ///
    /// The PRIMARY KEY on `sender_id` enforces the at-most-one-active
    /// invariant; inserting for an existing sender is an error.
    pub fn create(&self, sender_id: &str) -> Result<ConversationState> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations (sender_id, current_step, answers) VALUES (?1, 0, '[]')",
            params![sender_id],
        )?;

        info!("Created conversation for sender: {}", sender_id);
        Ok(ConversationState {
            sender_id: sender_id.to_string(),
            current_step: 0,
            answers: Vec::new(),
        })
    }

    /// Record one answer and advance the step, conditional on the caller's
    /// expected prior step.
    ///
    /// Returns [`Error::StepConflict`] when the stored step no longer matches
    /// `expected_step` (a concurrent transition won).
    pub fn record_answer(
        &self,
        sender_id: &str,
        expected_step: u32,
        answer: &str,
    ) -> Result<ConversationState> {
        let conn = self.conn.lock().unwrap();

        let current: std::result::Result<(u32, String), rusqlite::Error> = conn.query_row(
            "SELECT current_step, answers FROM conversations WHERE sender_id = ?1",
            params![sender_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        let (current_step, answers_json) = match current {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(Error::StepConflict {
                    sender_id: sender_id.to_string(),
                    expected: expected_step,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if current_step != expected_step {
            return Err(Error::StepConflict {
                sender_id: sender_id.to_string(),
                expected: expected_step,
            });
        }

        let mut answers: Vec<String> = serde_json::from_str(&answers_json)?;
        answers.push(answer.to_string());
        let updated_json = serde_json::to_string(&answers)?;

        let rows = conn.execute(
            "UPDATE conversations
             SET current_step = current_step + 1, answers = ?1
             WHERE sender_id = ?2 AND current_step = ?3",
            params![updated_json, sender_id, expected_step],
        )?;

        if rows == 0 {
            return Err(Error::StepConflict {
                sender_id: sender_id.to_string(),
                expected: expected_step,
            });
        }

        Ok(ConversationState {
            sender_id: sender_id.to_string(),
            current_step: expected_step + 1,
            answers,
        })
    }

    /// Archive a finished conversation and delete its active state.
    ///
    /// Both writes happen in one transaction; the delete is conditional on
    /// the state's step so a stale caller cannot archive twice.
    pub fn complete(&self, state: &ConversationState) -> Result<CompletedResponse> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let completed_at = Utc::now();
        let answers_json = serde_json::to_string(&state.answers)?;

        tx.execute(
            "INSERT INTO completed_responses (sender_id, answers, completed_at)
             VALUES (?1, ?2, ?3)",
            params![state.sender_id, answers_json, completed_at.to_rfc3339()],
        )?;

        let rows = tx.execute(
            "DELETE FROM conversations WHERE sender_id = ?1 AND current_step = ?2",
            params![state.sender_id, state.current_step],
        )?;

        if rows == 0 {
            return Err(Error::StepConflict {
                sender_id: state.sender_id.clone(),
                expected: state.current_step,
            });
        }

        tx.commit()?;
        info!("Archived completed conversation for sender: {}", state.sender_id);

        Ok(CompletedResponse {
            sender_id: state.sender_id.clone(),
            answers: state.answers.clone(),
            completed_at,
        })
    }

    /// List archived responses, newest first
    pub fn completed_responses(&self, limit: usize) -> Result<Vec<CompletedResponse>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sender_id, answers, completed_at FROM completed_responses
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let responses = stmt
            .query_map(params![limit as i64], |row| {
                let sender_id: String = row.get(0)?;
                let answers_json: String = row.get(1)?;
                let completed_at_str: String = row.get(2)?;
                Ok((sender_id, answers_json, completed_at_str))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        responses
            .into_iter()
            .map(|(sender_id, answers_json, completed_at_str)| {
                let answers: Vec<String> = serde_json::from_str(&answers_json)?;
                let completed_at = DateTime::parse_from_rfc3339(&completed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                Ok(CompletedResponse {
                    sender_id,
                    answers,
                    completed_at,
                })
            })
            .collect()
    }

    /// Count active conversations
    pub fn active_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
