use crate::domain::analysis::AiAnalysis;
use crate::domain::dataset::FileType;
use crate::domain::error::{AppError, Result};
use crate::domain::statistics::StatisticsSnapshot;
use crate::domain::upload::Upload;

use super::from_db_time;

#[derive(sqlx::FromRow)]
pub(super) struct UploadEntity {
    id: i64,
    stored_filename: String,
    original_filename: String,
    file_type: String,
    upload_time: String,
    row_count: i64,
    column_count: i64,
    analysis_time: Option<String>,
}

impl TryFrom<UploadEntity> for Upload {
    type Error = AppError;

    fn try_from(entity: UploadEntity) -> Result<Self> {
        let file_type: FileType = entity.file_type.parse().map_err(|_| {
            AppError::StorageFailure(format!(
                "Unknown file type '{}' stored for upload {}",
                entity.file_type, entity.id
            ))
        })?;

        Ok(Self {
            id: entity.id,
            stored_filename: entity.stored_filename,
            original_filename: entity.original_filename,
            file_type,
            upload_time: from_db_time(&entity.upload_time)?,
            row_count: entity.row_count,
            column_count: entity.column_count,
            analysis_time: entity
                .analysis_time
                .as_deref()
                .map(from_db_time)
                .transpose()?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct StatisticsEntity {
    id: i64,
    upload_id: i64,
    statistics_data: String,
    created_at: String,
}

impl TryFrom<StatisticsEntity> for StatisticsSnapshot {
    type Error = AppError;

    fn try_from(entity: StatisticsEntity) -> Result<Self> {
        let statistics_data = serde_json::from_str(&entity.statistics_data).map_err(|e| {
            AppError::StorageFailure(format!("Corrupt statistics snapshot {}: {}", entity.id, e))
        })?;

        Ok(Self {
            id: entity.id,
            upload_id: entity.upload_id,
            created_at: from_db_time(&entity.created_at)?,
            statistics_data,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct AiAnalysisEntity {
    id: i64,
    upload_id: i64,
    analysis_type: String,
    chart_name: Option<String>,
    analysis_content: String,
    created_at: String,
}

impl TryFrom<AiAnalysisEntity> for AiAnalysis {
    type Error = AppError;

    fn try_from(entity: AiAnalysisEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            upload_id: entity.upload_id,
            analysis_type: entity.analysis_type.parse()?,
            chart_name: entity.chart_name,
            analysis_content: entity.analysis_content,
            created_at: from_db_time(&entity.created_at)?,
        })
    }
}
