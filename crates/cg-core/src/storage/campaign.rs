//! Generated campaign record storage
//!
//! Records are write-once: created by the generator, never mutated.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::Result;

/// Campaign planning horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Monthly,
    Yearly,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Monthly => write!(f, "monthly"),
            Timeframe::Yearly => write!(f, "yearly"),
        }
    }
}

/// One generated marketing campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Unique record identifier
    pub id: String,
    /// Requesting user
    pub user_id: String,
    /// The free-text prompt the campaign was generated from
    pub prompt: String,
    /// Campaign name lifted from the generated payload
    pub campaign_name: Option<String>,
    /// Objective lifted from the generated payload
    pub objective: Option<String>,
    pub timeframe: Timeframe,
    pub channels: Vec<String>,
    /// Full structured output of the generation service
    pub generated: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl CampaignRecord {
    /// Build a record from the parsed generation output.
    ///
    /// `campaign_name` and `objective` are denormalized out of the payload
    /// so list views don't have to walk the JSON.
    pub fn new(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        timeframe: Timeframe,
        channels: Vec<String>,
        generated: JsonValue,
    ) -> Self {
        let campaign_name = generated
            .get("campaign_name")
            .and_then(|v| v.as_str())
            .map(String::from);
        let objective = generated
            .get("objective")
            .and_then(|v| v.as_str())
            .map(String::from);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            campaign_name,
            objective,
            timeframe,
            channels,
            generated,
            created_at: Utc::now(),
        }
    }
}

/// SQLite-backed store for campaign records
pub struct CampaignStore {
    conn: Mutex<Connection>,
}

impl CampaignStore {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening campaign database at: {}", db_path);
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
            "CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                campaign_name TEXT,
                objective TEXT,
                timeframe TEXT NOT NULL,
                channels TEXT NOT NULL,
                generated TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Persist one record
    pub fn insert(&self, record: &CampaignRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO campaigns
             (id, user_id, prompt, campaign_name, objective, timeframe, channels, generated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.user_id,
                record.prompt,
                record.campaign_name,
                record.objective,
                record.timeframe.to_string(),
                serde_json::to_string(&record.channels)?,
                serde_json::to_string(&record.generated)?,
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!("Saved campaign record: {}", record.id);
        Ok(())
    }

    /// Load a record by id
    pub fn get(&self, id: &str) -> Result<Option<CampaignRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, prompt, campaign_name, objective, timeframe, channels, generated, created_at
             FROM campaigns WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], Self::row_to_tuple);
        match result {
            Ok(row) => Ok(Some(Self::tuple_to_record(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List recent records, newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<CampaignRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, prompt, campaign_name, objective, timeframe, channels, generated, created_at
             FROM campaigns ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_tuple)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::tuple_to_record).collect()
    }

    /// Count stored records
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM campaigns", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[allow(clippy::type_complexity)]
    fn row_to_tuple(
        row: &rusqlite::Row<'_>,
    ) -> std::result::Result<
        (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
            String,
            String,
            String,
        ),
        rusqlite::Error,
    > {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        ))
    }

    fn tuple_to_record(
        (id, user_id, prompt, campaign_name, objective, timeframe, channels, generated, created_at): (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
            String,
            String,
            String,
        ),
    ) -> Result<CampaignRecord> {
        let timeframe = match timeframe.as_str() {
            "yearly" => Timeframe::Yearly,
            _ => Timeframe::Monthly,
        };
        let channels: Vec<String> = serde_json::from_str(&channels)?;
        let generated: JsonValue = serde_json::from_str(&generated)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(CampaignRecord {
            id,
            user_id,
            prompt,
            campaign_name,
            objective,
            timeframe,
            channels,
            generated,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> CampaignRecord {
        CampaignRecord::new(
            "user-1",
            "Launch an eco-friendly water bottle",
            Timeframe::Monthly,
            vec!["google_ads".to_string(), "instagram".to_string()],
            json!({
                "campaign_name": "Refill Revolution",
                "objective": "Drive awareness",
                "google_ads": [],
                "kpis": {"ctr": "3.5%"}
            }),
        )
    }

    #[test]
    fn test_name_and_objective_denormalized() {
        let record = sample_record();
        assert_eq!(record.campaign_name.as_deref(), Some("Refill Revolution"));
        assert_eq!(record.objective.as_deref(), Some("Drive awareness"));
    }

    #[test]
    fn test_insert_and_get() -> Result<()> {
        let store = CampaignStore::in_memory()?;
        let record = sample_record();
        store.insert(&record)?;

        let loaded = store.get(&record.id)?.unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.timeframe, Timeframe::Monthly);
        assert_eq!(loaded.channels.len(), 2);
        assert_eq!(loaded.generated["kpis"]["ctr"], "3.5%");

        Ok(())
    }

    #[test]
    fn test_get_missing_returns_none() -> Result<()> {
        let store = CampaignStore::in_memory()?;
        assert!(store.get("nope")?.is_none());
        Ok(())
    }

    #[test]
    fn test_list_recent() -> Result<()> {
        let store = CampaignStore::in_memory()?;
        for _ in 0..3 {
            store.insert(&sample_record())?;
        }

        assert_eq!(store.count()?, 3);
        assert_eq!(store.list_recent(2)?.len(), 2);
        Ok(())
    }
}
