use chrono::Utc;

use crate::domain::analysis::{AiAnalysis, AnalysisType};
use crate::domain::error::{AppError, Result};

use super::entities::AiAnalysisEntity;
use super::{ensure_upload_exists, to_db_time, UploadRepository};

impl UploadRepository {
    pub async fn save_ai_analysis(
        &self,
        upload_id: i64,
        analysis_type: AnalysisType,
        content: &str,
        chart_name: Option<&str>,
    ) -> Result<i64> {
        let pool = self.pool().await?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to begin transaction: {}", e)))?;

        ensure_upload_exists(&mut *tx, upload_id).await?;

        let result = sqlx::query(
            "INSERT INTO ai_analysis (upload_id, analysis_type, chart_name, analysis_content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(upload_id)
        .bind(analysis_type.as_str())
        .bind(chart_name)
        .bind(content)
        .bind(to_db_time(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to save analysis: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to commit analysis: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// Analyses for an upload, newest first.
    pub async fn get_ai_analyses(&self, upload_id: i64) -> Result<Vec<AiAnalysis>> {
        let pool = self.pool().await?;
        let entities = sqlx::query_as::<_, AiAnalysisEntity>(
            "SELECT id, upload_id, analysis_type, chart_name, analysis_content, created_at
             FROM ai_analysis
             WHERE upload_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(upload_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to fetch analyses: {}", e)))?;

        entities.into_iter().map(AiAnalysis::try_from).collect()
    }
}
