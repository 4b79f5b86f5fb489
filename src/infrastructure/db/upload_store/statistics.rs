use chrono::Utc;

use crate::domain::error::{AppError, Result};
use crate::domain::statistics::{StatisticsSnapshot, StatisticsSummary};

use super::entities::StatisticsEntity;
use super::{ensure_upload_exists, to_db_time, UploadRepository};

impl UploadRepository {
    /// Append a snapshot; earlier snapshots for the upload are kept.
    pub async fn save_statistics(
        &self,
        upload_id: i64,
        summary: &StatisticsSummary,
    ) -> Result<i64> {
        let statistics_data = serde_json::to_string(summary).map_err(|e| {
            AppError::StorageFailure(format!("Failed to serialize statistics: {}", e))
        })?;

        let pool = self.pool().await?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to begin transaction: {}", e)))?;

        ensure_upload_exists(&mut *tx, upload_id).await?;

        let result = sqlx::query(
            "INSERT INTO statistics (upload_id, statistics_data, created_at) VALUES (?, ?, ?)",
        )
        .bind(upload_id)
        .bind(statistics_data)
        .bind(to_db_time(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to save statistics: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to commit statistics: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent snapshot for an upload, if any.
    pub async fn get_statistics(&self, upload_id: i64) -> Result<Option<StatisticsSnapshot>> {
        let pool = self.pool().await?;
        let entity = sqlx::query_as::<_, StatisticsEntity>(
            "SELECT id, upload_id, statistics_data, created_at FROM statistics
             WHERE upload_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(upload_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to fetch statistics: {}", e)))?;

        entity.map(StatisticsSnapshot::try_from).transpose()
    }
}
