use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Overall,
    ChartSpecific,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Overall => "overall",
            AnalysisType::ChartSpecific => "chart_specific",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "overall" => Ok(AnalysisType::Overall),
            "chart_specific" => Ok(AnalysisType::ChartSpecific),
            other => Err(AppError::StorageFailure(format!(
                "Unknown analysis type stored: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub id: i64,
    pub upload_id: i64,
    pub analysis_type: AnalysisType,
    pub chart_name: Option<String>,
    pub analysis_content: String,
    pub created_at: DateTime<Utc>,
}
