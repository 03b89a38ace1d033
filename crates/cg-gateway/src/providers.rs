//! Dashboard provider backed by the campaign store

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use cg_core::{CampaignRecord, CampaignStore};
use cg_dashboard::CampaignProvider;

/// Serves dashboard reads straight from the SQLite campaign store
pub struct StoreCampaignProvider {
    store: Arc<CampaignStore>,
}

impl StoreCampaignProvider {
    pub fn new(store: Arc<CampaignStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CampaignProvider for StoreCampaignProvider {
    async fn list_campaigns(&self, limit: usize) -> Vec<CampaignRecord> {
        match self.store.list_recent(limit) {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to list campaigns: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_campaign(&self, id: &str) -> Option<CampaignRecord> {
        match self.store.get(id) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to load campaign {}: {}", id, e);
                None
            }
        }
    }
}
