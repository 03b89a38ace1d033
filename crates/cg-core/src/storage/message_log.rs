//! Outbound message log
//!
//! Append-only record of delivered replies, one row per send.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One logged exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub id: i64,
    pub sender_id: String,
    /// Inbound text that triggered the reply, if any
    pub inbound: String,
    /// Outbound reply text
    pub outbound: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed message log
pub struct MessageLog {
    conn: Mutex<Connection>,
}

impl MessageLog {
    /// Create a new log with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_tables()?;
        Ok(log)
    }

    /// Create an in-memory log (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_tables()?;
        Ok(log)
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS message_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id TEXT NOT NULL,
                inbound TEXT NOT NULL,
                outbound TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Append one row
    pub fn append(&self, sender_id: &str, inbound: &str, outbound: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO message_log (sender_id, inbound, outbound, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![sender_id, inbound, outbound, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// List recent rows, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<MessageLogEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, inbound, outbound, created_at FROM message_log
             ORDER BY id DESC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                let id: i64 = row.get(0)?;
                let sender_id: String = row.get(1)?;
                let inbound: String = row.get(2)?;
                let outbound: String = row.get(3)?;
                let created_at_str: String = row.get(4)?;
                Ok((id, sender_id, inbound, outbound, created_at_str))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries
            .into_iter()
            .map(|(id, sender_id, inbound, outbound, created_at_str)| {
                let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                MessageLogEntry {
                    id,
                    sender_id,
                    inbound,
                    outbound,
                    created_at,
                }
            })
            .collect())
    }

    /// Count logged rows
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM message_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
