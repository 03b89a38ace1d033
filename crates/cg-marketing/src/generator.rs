//! Campaign generation
//!
//! Builds the strategist prompt, calls Gemini, extracts the JSON object
//! from the reply text and persists the resulting record. Rate-limit
//! retries live in the Gemini client; everything else propagates.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use cg_core::{CampaignRecord, CampaignStore, GeminiClient, Timeframe};

use crate::error::{MarketingError, Result};

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerateCampaign {
    pub prompt: String,
    pub timeframe: Timeframe,
    pub channels: Vec<String>,
    pub user_id: String,
}

/// Campaign generator
pub struct CampaignGenerator {
    gemini: Arc<GeminiClient>,
    store: Arc<CampaignStore>,
}

impl CampaignGenerator {
    /// Create a new generator
    pub fn new(gemini: Arc<GeminiClient>, store: Arc<CampaignStore>) -> Self {
        Self { gemini, store }
    }

    /// Generate and persist one campaign record
    pub async fn generate(&self, request: GenerateCampaign) -> Result<CampaignRecord> {
        let full_prompt = build_prompt(&request.prompt, request.timeframe);
        debug!("Generating campaign for user {}", request.user_id);

        let output = self.gemini.generate_content(&full_prompt).await?;
        let generated = extract_json(&output)?;

        let record = CampaignRecord::new(
            request.user_id,
            request.prompt,
            request.timeframe,
            request.channels,
            generated,
        );
        self.store.insert(&record)?;

        info!("Generated campaign {} for user {}", record.id, record.user_id);
        Ok(record)
    }
}

/// Build the fixed strategist instruction embedding the user prompt
fn build_prompt(prompt: &str, timeframe: Timeframe) -> String {
    let post_count = match timeframe {
        Timeframe::Monthly => 12,
        Timeframe::Yearly => 52,
    };

    format!(
        r#"You are a professional marketing strategist AI. Given this prompt: "{prompt}", create a structured marketing plan including:
1. Campaign name & objective
2. Google Ads (headlines, descriptions, keywords, budget)
3. Instagram Reel ideas (title, script, hashtags)
4. Hashtags (primary, secondary, niche)
5. Social media posts ({post_count} posts for a {timeframe} calendar)
6. KPIs (expected CTR, CVR, engagement)
Return the result strictly in JSON format, with keys:
{{
  "campaign_name": "",
  "objective": "",
  "google_ads": [],
  "instagram_reels": [],
  "hashtags": {{ "primary": [], "secondary": [], "niche": [] }},
  "social_posts": [],
  "kpis": {{}}
}}"#
    )
}

/// Extract the JSON object between the first `{` and the last `}`.
///
/// Models wrap their JSON in prose or code fences; anything outside the
/// outermost braces is discarded. Missing braces or invalid JSON surface
/// as [`MarketingError::UnparseableOutput`] with the raw text attached.
fn extract_json(output: &str) -> Result<JsonValue> {
    let start = output.find('{');
    let end = output.rfind('}');

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(MarketingError::UnparseableOutput {
                raw: output.to_string(),
            });
        }
    };

    serde_json::from_str(&output[start..=end]).map_err(|_| MarketingError::UnparseableOutput {
        raw: output.to_string(),
    })
}
