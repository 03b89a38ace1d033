//! CSV export
//!
//! Flattens a campaign record into one row per logical section: a campaign
//! summary row, one row per Google ad, per reel idea and per social post,
//! and a final KPI row. The header is the union of all row keys in
//! first-appearance order.

use serde_json::Value as JsonValue;

use cg_core::CampaignRecord;

/// One flattened row: ordered key/value pairs
pub type Row = Vec<(String, String)>;

/// Flatten a campaign record into CSV rows
pub fn campaign_rows(record: &CampaignRecord) -> Vec<Row> {
    let generated = &record.generated;
    let mut rows = Vec::new();

    // Campaign summary row
    rows.push(vec![
        ("type".to_string(), "campaign".to_string()),
        (
            "campaignName".to_string(),
            record
                .campaign_name
                .clone()
                .unwrap_or_else(|| str_field(generated, "campaign_name")),
        ),
        (
            "objective".to_string(),
            record
                .objective
                .clone()
                .unwrap_or_else(|| str_field(generated, "objective")),
        ),
        ("timeframe".to_string(), record.timeframe.to_string()),
        ("channels".to_string(), record.channels.join("|")),
    ]);

    // Google ads rows
    for (i, ad) in array_field(generated, "google_ads").iter().enumerate() {
        rows.push(vec![
            ("type".to_string(), format!("google_ad_{}", i + 1)),
            ("ad_type".to_string(), str_field(ad, "type")),
            ("headlines".to_string(), joined_field(ad, "headlines")),
            ("descriptions".to_string(), joined_field(ad, "descriptions")),
            ("keywords".to_string(), joined_field(ad, "keywords")),
            ("budget_monthly".to_string(), str_field(ad, "budget_monthly")),
        ]);
    }

    // Instagram reels rows
    for (i, reel) in array_field(generated, "instagram_reels").iter().enumerate() {
        rows.push(vec![
            ("type".to_string(), format!("ig_reel_{}", i + 1)),
            ("title".to_string(), str_field(reel, "title")),
            ("script".to_string(), str_field(reel, "script")),
            ("hashtags".to_string(), joined_field(reel, "hashtags")),
        ]);
    }

    // Social posts rows
    for (i, post) in array_field(generated, "social_posts").iter().enumerate() {
        rows.push(vec![
            ("type".to_string(), format!("social_post_{}", i + 1)),
            ("platform".to_string(), str_field(post, "platform")),
            ("post_type".to_string(), str_field(post, "type")),
            ("caption".to_string(), str_field(post, "caption")),
        ]);
    }

    // KPIs row
    let mut kpi_row = vec![("type".to_string(), "kpis".to_string())];
    if let Some(kpis) = generated.get("kpis").and_then(|v| v.as_object()) {
        for (key, value) in kpis {
            kpi_row.push((key.clone(), scalar_to_string(value)));
        }
    }
    rows.push(kpi_row);

    rows
}

/// Render rows as CSV text.
///
/// The header is the union of all row keys, keeping first-appearance order;
/// every cell is quoted, with internal quotes doubled.
pub fn to_csv(rows: &[Row]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut keys: Vec<&str> = Vec::new();
    for row in rows {
        for (key, _) in row {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(keys.join(","));

    for row in rows {
        let cells: Vec<String> = keys
            .iter()
            .map(|key| {
                let cell = row
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("");
                format!("\"{}\"", cell.replace('"', "\"\""))
            })
            .collect();
        lines.push(cells.join(","));
    }

    lines.join("\n")
}

/// Flatten and render one record
pub fn export_csv(record: &CampaignRecord) -> String {
    to_csv(&campaign_rows(record))
}

fn str_field(value: &JsonValue, key: &str) -> String {
    match value.get(key) {
        Some(v) => scalar_to_string(v),
        None => String::new(),
    }
}

fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn array_field<'a>(value: &'a JsonValue, key: &str) -> &'a [JsonValue] {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

fn joined_field(value: &JsonValue, key: &str) -> String {
    array_field(value, key)
        .iter()
        .map(scalar_to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::Timeframe;
    use serde_json::json;

    fn sample_record() -> CampaignRecord {
        CampaignRecord::new(
            "user-1",
            "Launch an eco-friendly water bottle",
            Timeframe::Monthly,
            vec!["google_ads".to_string(), "instagram".to_string()],
            json!({
                "campaign_name": "Refill Revolution",
                "objective": "Drive awareness and initial sales",
                "google_ads": [
                    {
                        "type": "search",
                        "headlines": ["Ditch Plastic", "Hydrate Better"],
                        "descriptions": ["Eco bottles that last"],
                        "keywords": ["water bottle", "eco"],
                        "budget_monthly": 500
                    },
                    {
                        "type": "display",
                        "headlines": ["See the bottle"],
                        "descriptions": [],
                        "keywords": [],
                        "budget_monthly": "250"
                    }
                ],
                "instagram_reels": [
                    {"title": "Unboxing", "script": "Open the box...", "hashtags": ["#eco"]},
                    {"title": "Refill demo", "script": "Refill at any fountain", "hashtags": []},
                    {"title": "Review", "script": "Customer speaks", "hashtags": ["#water"]}
                ],
                "social_posts": [
                    {"platform": "instagram", "type": "reel", "caption": "The wait is over"},
                    {"platform": "facebook", "type": "image", "caption": "Say \"goodbye\" to plastic"}
                ],
                "kpis": {
                    "google_ads_ctr": "3.5%",
                    "website_conversion_rate": "1.5% - 2.5%"
                }
            }),
        )
    }

    #[test]
    fn test_row_count_is_sections_plus_items() {
        // 1 summary + 2 ads + 3 reels + 2 posts + 1 kpi row
        let rows = campaign_rows(&sample_record());
        assert_eq!(rows.len(), 1 + 2 + 3 + 2 + 1);
    }

    #[test]
    fn test_header_is_deduplicated_union_in_order() {
        let rows = campaign_rows(&sample_record());
        let csv = to_csv(&rows);
        let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();

        // "type" appears in every row but only once in the header.
        assert_eq!(header.iter().filter(|k| **k == "type").count(), 1);
        assert_eq!(header[0], "type");

        // Union covers keys from every section.
        for key in [
            "campaignName",
            "channels",
            "headlines",
            "budget_monthly",
            "script",
            "caption",
            "google_ads_ctr",
            "website_conversion_rate",
        ] {
            assert!(header.contains(&key), "header missing {}", key);
        }

        let mut sorted = header.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), header.len(), "header contains duplicates");
    }

    #[test]
    fn test_every_line_has_header_arity() {
        let rows = campaign_rows(&sample_record());
        let csv = to_csv(&rows);
        let mut lines = csv.lines();
        let header_len = lines.next().unwrap().split(',').count();

        for line in lines {
            // Cells are fully quoted, so "," is a safe separator for
            // counting as long as cell text avoids `","` sequences.
            assert_eq!(line.split("\",\"").count(), header_len, "line: {}", line);
        }
    }

    #[test]
    fn test_internal_quotes_are_doubled() {
        let csv = export_csv(&sample_record());
        assert!(csv.contains(r#""Say ""goodbye"" to plastic""#));
    }

    #[test]
    fn test_channels_joined_with_pipe() {
        let csv = export_csv(&sample_record());
        assert!(csv.contains("\"google_ads|instagram\""));
    }

    #[test]
    fn test_list_cells_joined_with_spaced_pipe() {
        let csv = export_csv(&sample_record());
        assert!(csv.contains("\"Ditch Plastic | Hydrate Better\""));
        assert!(csv.contains("\"water bottle | eco\""));
    }

    #[test]
    fn test_numeric_budget_is_stringified() {
        let rows = campaign_rows(&sample_record());
        let ad_row = &rows[1];
        let budget = ad_row
            .iter()
            .find(|(k, _)| k == "budget_monthly")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert_eq!(budget, "500");
    }

    #[test]
    fn test_empty_generated_payload_still_exports() {
        let record = CampaignRecord::new(
            "user-1",
            "prompt",
            Timeframe::Yearly,
            vec![],
            json!({}),
        );
        let rows = campaign_rows(&record);
        // Summary + KPI row survive an empty payload.
        assert_eq!(rows.len(), 2);

        let csv = to_csv(&rows);
        assert!(csv.lines().next().unwrap().starts_with("type,"));
        assert!(csv.contains("\"yearly\""));
    }

    #[test]
    fn test_to_csv_empty_rows() {
        assert_eq!(to_csv(&[]), "");
    }
}
