use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Numeric summary of one column. All continuous fields are rounded to four
/// decimal places; a column without numeric values is all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Column name to summary, in first-seen column order.
pub type StatisticsSummary = IndexMap<String, ColumnSummary>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub id: i64,
    pub upload_id: i64,
    pub created_at: DateTime<Utc>,
    pub statistics_data: StatisticsSummary,
}
