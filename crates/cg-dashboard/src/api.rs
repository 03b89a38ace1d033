//! Dashboard API types and handlers
//!
//! Provides the REST endpoints and the HTML report page.

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use cg_core::CampaignRecord;

use crate::export::export_csv;

/// Campaign data provider
#[async_trait]
pub trait CampaignProvider: Send + Sync {
    /// List recent campaign records, newest first
    async fn list_campaigns(&self, limit: usize) -> Vec<CampaignRecord>;

    /// Get a specific campaign record by id
    async fn get_campaign(&self, id: &str) -> Option<CampaignRecord>;
}

/// Dashboard state shared across handlers
pub struct DashboardState {
    /// Campaign data provider
    pub campaigns: Arc<dyn CampaignProvider + Send + Sync>,
}

impl Clone for DashboardState {
    fn clone(&self) -> Self {
        Self {
            campaigns: self.campaigns.clone(),
        }
    }
}

impl DashboardState {
    /// Create a new dashboard state
    pub fn new(campaigns: Arc<dyn CampaignProvider + Send + Sync>) -> Self {
        Self { campaigns }
    }
}

/// Query parameters for the campaign list
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignQuery {
    /// Limit results
    pub limit: Option<usize>,
}

/// Create the dashboard router
pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard_index))
        .route("/api/campaigns", get(list_campaigns))
        .route("/api/campaigns/{id}", get(get_campaign))
        .route("/api/campaigns/{id}/export.csv", get(export_campaign))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(Arc::new(state))
}

/// Dashboard index page
async fn dashboard_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// List campaigns API endpoint
async fn list_campaigns(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<CampaignQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50);
    let campaigns = state.campaigns.list_campaigns(limit).await;
    Json(campaigns)
}

/// Get a specific campaign
async fn get_campaign(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.campaigns.get_campaign(&id).await {
        Some(campaign) => Json(campaign).into_response(),
        None => (StatusCode::NOT_FOUND, "Campaign not found").into_response(),
    }
}

/// Download a campaign as CSV
async fn export_campaign(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(campaign) = state.campaigns.get_campaign(&id).await else {
        return (StatusCode::NOT_FOUND, "Campaign not found").into_response();
    };

    let csv = export_csv(&campaign);
    let filename = campaign
        .campaign_name
        .as_deref()
        .unwrap_or("campaign")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cg-dashboard"
    }))
}

/// Index HTML template
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Campaign Dashboard</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f5f5f5;
            color: #333;
            line-height: 1.6;
        }
        .container { max-width: 1200px; margin: 0 auto; padding: 20px; }
        header {
            background: #2c3e50;
            color: white;
            padding: 20px;
            margin-bottom: 20px;
        }
        header h1 { font-size: 24px; }
        .campaigns-table, .detail-panel {
            background: white;
            border-radius: 8px;
            padding: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #eee; }
        th { background: #f8f9fa; font-weight: 600; }
        tr.selectable { cursor: pointer; }
        tr.selectable:hover { background: #f8f9fa; }
        .refresh-btn, .export-link {
            background: #3498db;
            color: white;
            border: none;
            padding: 8px 16px;
            border-radius: 4px;
            cursor: pointer;
            text-decoration: none;
            display: inline-block;
            font-size: 14px;
        }
        .refresh-btn:hover, .export-link:hover { background: #2980b9; }
        .refresh-btn { margin-bottom: 20px; }
        .section { margin-top: 16px; }
        .section h3 { font-size: 14px; color: #666; margin-bottom: 8px; }
        .kpi-row { display: flex; justify-content: space-between; font-size: 14px; padding: 4px 0; }
        .tag {
            display: inline-block;
            padding: 2px 8px;
            border-radius: 10px;
            background: #eef2f5;
            font-size: 12px;
            margin: 2px;
        }
        .muted { color: #888; font-size: 13px; }
    </style>
</head>
<body>
    <header>
        <h1>Campaign Dashboard</h1>
    </header>
    <div class="container">
        <button class="refresh-btn" onclick="loadCampaigns()">Refresh</button>

        <div class="campaigns-table">
            <h2>Recent Campaigns</h2>
            <table>
                <thead>
                    <tr>
                        <th>Name</th>
                        <th>Objective</th>
                        <th>Timeframe</th>
                        <th>Channels</th>
                        <th>Created</th>
                        <th>Export</th>
                    </tr>
                </thead>
                <tbody id="campaigns-body">
                </tbody>
            </table>
        </div>

        <div class="detail-panel" id="detail" style="display: none">
            <h2 id="detail-name"></h2>
            <p class="muted" id="detail-objective"></p>
            <div class="section" id="detail-kpis"></div>
            <div class="section" id="detail-ads"></div>
            <div class="section" id="detail-reels"></div>
            <div class="section" id="detail-posts"></div>
            <div class="section" id="detail-hashtags"></div>
        </div>
    </div>
    <script>
        async function loadCampaigns() {
            try {
                const res = await fetch('/api/campaigns?limit=20');
                if (!res.ok) return;
                const campaigns = await res.json();
                const tbody = document.getElementById('campaigns-body');
                tbody.innerHTML = campaigns.map(c => `
                    <tr class="selectable" onclick="showDetail('${c.id}')">
                        <td>${c.campaign_name || '(untitled)'}</td>
                        <td>${(c.objective || '').substring(0, 60)}</td>
                        <td>${c.timeframe}</td>
                        <td>${c.channels.join(', ')}</td>
                        <td>${new Date(c.created_at).toLocaleString()}</td>
                        <td><a class="export-link" href="/api/campaigns/${c.id}/export.csv"
                               onclick="event.stopPropagation()">CSV</a></td>
                    </tr>
                `).join('');
            } catch (e) {
                console.error('Failed to load campaigns:', e);
            }
        }

        async function showDetail(id) {
            const res = await fetch('/api/campaigns/' + id);
            if (!res.ok) return;
            const c = await res.json();
            const g = c.generated || {};

            document.getElementById('detail').style.display = 'block';
            document.getElementById('detail-name').textContent = c.campaign_name || '(untitled)';
            document.getElementById('detail-objective').textContent = c.objective || '';

            document.getElementById('detail-kpis').innerHTML =
                '<h3>KPIs & Targets</h3>' +
                Object.entries(g.kpis || {}).map(([k, v]) =>
                    `<div class="kpi-row"><span>${k.replace(/_/g, ' ')}</span><strong>${v}</strong></div>`
                ).join('');

            document.getElementById('detail-ads').innerHTML =
                '<h3>Google Ads</h3>' +
                (g.google_ads || []).map((ad, i) => `
                    <div>
                        <strong>Ad #${i + 1}</strong>
                        <div class="muted">Headlines: ${(ad.headlines || []).join(' | ')}</div>
                        <div class="muted">Keywords: ${(ad.keywords || []).join(', ')}</div>
                        <div class="muted">Budget (monthly): ${ad.budget_monthly ?? ''}</div>
                    </div>
                `).join('');

            document.getElementById('detail-reels').innerHTML =
                '<h3>Instagram Reels</h3>' +
                (g.instagram_reels || []).map(r => `
                    <div>
                        <strong>${r.title || ''}</strong>
                        <div class="muted">${r.script || ''}</div>
                        <div>${(r.hashtags || []).map(t => `<span class="tag">${t}</span>`).join('')}</div>
                    </div>
                `).join('');

            document.getElementById('detail-posts').innerHTML =
                '<h3>Social Posts</h3>' +
                '<table><thead><tr><th>Platform</th><th>Type</th><th>Caption</th></tr></thead><tbody>' +
                (g.social_posts || []).map(p => `
                    <tr><td>${p.platform || ''}</td><td>${p.type || ''}</td><td>${p.caption || ''}</td></tr>
                `).join('') + '</tbody></table>';

            document.getElementById('detail-hashtags').innerHTML =
                '<h3>Hashtags</h3>' +
                Object.entries(g.hashtags || {}).map(([group, tags]) => `
                    <div><span class="muted">${group}</span>
                        ${(tags || []).map(t => `<span class="tag">${t}</span>`).join('')}
                    </div>
                `).join('');
        }

        loadCampaigns();
        setInterval(loadCampaigns, 30000);
    </script>
</body>
</html>
"#;
