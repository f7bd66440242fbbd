use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One past scan as listed by `GET /api/history`, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub product_name: String,
    pub health_score: Option<f64>,
    pub eco_score: Option<f64>,
    /// Server-relative path of the uploaded image.
    pub image: String,
    pub timestamp: NaiveDateTime,
}
