use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::upload::{NewUpload, Upload};

use super::entities::UploadEntity;
use super::{to_db_time, UploadRepository};

const UPLOAD_COLUMNS: &str = "id, stored_filename, original_filename, file_type, upload_time, \
     row_count, column_count, analysis_time";

// Dependents first; the upload row goes last so foreign keys never dangle.
const DELETE_STATEMENTS: [(&str, &str); 4] = [
    ("data_records", "DELETE FROM data_records WHERE upload_id = ?"),
    ("statistics", "DELETE FROM statistics WHERE upload_id = ?"),
    ("ai_analysis", "DELETE FROM ai_analysis WHERE upload_id = ?"),
    ("uploads", "DELETE FROM uploads WHERE id = ?"),
];

impl UploadRepository {
    /// Insert a new upload row and return its generated id.
    pub async fn save_upload(&self, upload: &NewUpload) -> Result<i64> {
        let pool = self.pool().await?;
        let result = sqlx::query(
            "INSERT INTO uploads (stored_filename, original_filename, file_type, upload_time, row_count, column_count)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&upload.stored_filename)
        .bind(&upload.original_filename)
        .bind(upload.file_type.as_str())
        .bind(to_db_time(&upload.upload_time))
        .bind(upload.row_count)
        .bind(upload.column_count)
        .execute(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to save upload: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_analysis_time(
        &self,
        upload_id: i64,
        analysis_time: DateTime<Utc>,
    ) -> Result<()> {
        let pool = self.pool().await?;
        let result = sqlx::query("UPDATE uploads SET analysis_time = ? WHERE id = ?")
            .bind(to_db_time(&analysis_time))
            .bind(upload_id)
            .execute(&pool)
            .await
            .map_err(|e| {
                AppError::StorageFailure(format!("Failed to update analysis time: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Upload not found: {}", upload_id)));
        }
        Ok(())
    }

    pub async fn get_upload(&self, upload_id: i64) -> Result<Option<Upload>> {
        let pool = self.pool().await?;
        let entity = sqlx::query_as::<_, UploadEntity>(&format!(
            "SELECT {} FROM uploads WHERE id = ?",
            UPLOAD_COLUMNS
        ))
        .bind(upload_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to fetch upload: {}", e)))?;

        entity.map(Upload::try_from).transpose()
    }

    /// All uploads, most recent upload time first.
    pub async fn get_all_uploads(&self) -> Result<Vec<Upload>> {
        let pool = self.pool().await?;
        let entities = sqlx::query_as::<_, UploadEntity>(&format!(
            "SELECT {} FROM uploads ORDER BY upload_time DESC, id DESC",
            UPLOAD_COLUMNS
        ))
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to list uploads: {}", e)))?;

        entities.into_iter().map(Upload::try_from).collect()
    }

    /// Remove an upload and everything it owns in one transaction. Either all
    /// four tables lose the upload's rows or none do. Returns whether an
    /// upload row existed.
    pub async fn delete_upload(&self, upload_id: i64) -> Result<bool> {
        let pool = self.pool().await?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to begin delete: {}", e)))?;

        let mut upload_deleted = false;
        for (table, statement) in DELETE_STATEMENTS {
            // Dropping `tx` on the error path rolls back every earlier delete.
            let result = sqlx::query(statement)
                .bind(upload_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    warn!(upload_id, table, error = %e, "Delete failed, rolling back");
                    AppError::StorageFailure(format!("Failed to delete from {}: {}", table, e))
                })?;
            if table == "uploads" {
                upload_deleted = result.rows_affected() > 0;
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to commit delete: {}", e)))?;

        info!(upload_id, upload_deleted, "Upload deleted");
        Ok(upload_deleted)
    }
}
