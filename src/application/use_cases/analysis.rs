use crate::domain::analysis::AnalysisType;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::statistics::StatisticsSummary;
use crate::infrastructure::db::upload_store::UploadRepository;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

const ANALYST_SYSTEM_PROMPT: &str = "You are a professional data analyst. Write clear, \
concise findings for a business reader. Use plain prose with short sections.";

pub const DEFAULT_CHART_TYPE: &str = "line";

/// What the model is asked to look at.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    Overall,
    Chart {
        chart_name: String,
        chart_data: Value,
        chart_type: String,
    },
}

impl AnalysisRequest {
    /// Build a request from loosely typed input. `kind` is `overall` or
    /// `chart`; a chart needs a non-empty name and a data payload.
    pub fn from_parts(
        kind: Option<&str>,
        chart_name: Option<String>,
        chart_data: Option<Value>,
        chart_type: Option<String>,
    ) -> Result<Self> {
        match kind {
            Some("overall") => Ok(Self::Overall),
            Some("chart") => {
                let chart_name = chart_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| AppError::InvalidRequest("Missing chart name".to_string()))?;
                let chart_data = chart_data
                    .filter(|data| !data.is_null())
                    .ok_or_else(|| AppError::InvalidRequest("Missing chart data".to_string()))?;
                let chart_type = chart_type
                    .filter(|kind| !kind.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CHART_TYPE.to_string());

                Ok(Self::Chart {
                    chart_name,
                    chart_data,
                    chart_type,
                })
            }
            Some(other) => Err(AppError::InvalidRequest(format!(
                "Invalid analysis type: {}",
                other
            ))),
            None => Err(AppError::InvalidRequest(
                "Missing analysis type".to_string(),
            )),
        }
    }

    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Self::Overall => AnalysisType::Overall,
            Self::Chart { .. } => AnalysisType::ChartSpecific,
        }
    }

    fn chart_name(&self) -> Option<&str> {
        match self {
            Self::Overall => None,
            Self::Chart { chart_name, .. } => Some(chart_name),
        }
    }
}

fn overall_prompt(record_count: i64, statistics: &StatisticsSummary) -> String {
    let columns: Vec<&str> = statistics.keys().map(String::as_str).collect();
    let summary = serde_json::to_string_pretty(statistics).unwrap_or_default();

    format!(
        "Analyze the following dataset.\n\
         Record count: {}\n\
         Columns: {}\n\
         Statistics summary:\n{}\n\n\
         Describe the overall trends, key insights, outliers and recommendations.",
        record_count,
        columns.join(", "),
        summary
    )
}

fn chart_prompt(chart_name: &str, chart_type: &str, chart_data: &Value) -> String {
    let data = serde_json::to_string_pretty(chart_data).unwrap_or_default();

    format!(
        "Analyze the following chart.\n\
         Chart name: {}\n\
         Chart type: {}\n\
         Data:\n{}\n\n\
         Describe the trend, the key changes and recommendations.",
        chart_name, chart_type, data
    )
}

pub struct AnalyzeUseCase {
    llm_client: Arc<dyn LLMClient>,
    repository: Arc<UploadRepository>,
    config: LLMConfig,
}

impl AnalyzeUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        repository: Arc<UploadRepository>,
        config: LLMConfig,
    ) -> Self {
        Self {
            llm_client,
            repository,
            config,
        }
    }

    /// Ask the model about an upload, store the answer and stamp the
    /// upload's analysis time. Returns the cleaned analysis text.
    pub async fn execute(&self, upload_id: i64, request: &AnalysisRequest) -> Result<String> {
        let upload = self
            .repository
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload not found: {}", upload_id)))?;

        let user_prompt = match request {
            AnalysisRequest::Overall => {
                let snapshot = self.repository.get_statistics(upload_id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Statistics not found for upload {}", upload_id))
                })?;
                overall_prompt(upload.row_count, &snapshot.statistics_data)
            }
            AnalysisRequest::Chart {
                chart_name,
                chart_data,
                chart_type,
            } => chart_prompt(chart_name, chart_type, chart_data),
        };

        let raw = self
            .llm_client
            .generate(&self.config, ANALYST_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| {
                error!(upload_id, error = %e, "Model call failed");
                match e {
                    AppError::AnalysisFailure(_) => e,
                    other => AppError::AnalysisFailure(other.to_string()),
                }
            })?;

        let analysis = clean_llm_response(&raw);
        if analysis.is_empty() {
            return Err(AppError::AnalysisFailure(
                "Model returned an empty response".to_string(),
            ));
        }

        let analysis_type = request.analysis_type();
        self.repository
            .save_ai_analysis(upload_id, analysis_type, &analysis, request.chart_name())
            .await?;
        self.repository
            .update_analysis_time(upload_id, Utc::now())
            .await?;

        info!(upload_id, analysis_type = analysis_type.as_str(), "Analysis stored");
        Ok(analysis)
    }
}
