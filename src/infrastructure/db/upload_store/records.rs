use tracing::debug;

use crate::domain::dataset::Row;
use crate::domain::error::{AppError, Result};

use super::{ensure_upload_exists, UploadRepository};

impl UploadRepository {
    /// Store every row of an upload, keyed by its position in the file.
    /// Runs in one transaction; a failure leaves no partial rows behind.
    pub async fn save_data_records(&self, upload_id: i64, rows: &[Row]) -> Result<u64> {
        let pool = self.pool().await?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to begin transaction: {}", e)))?;

        ensure_upload_exists(&mut *tx, upload_id).await?;

        let mut inserted = 0u64;
        for (row_index, row) in rows.iter().enumerate() {
            let column_data = serde_json::to_string(row).map_err(|e| {
                AppError::StorageFailure(format!("Failed to serialize row {}: {}", row_index, e))
            })?;

            let result = sqlx::query(
                "INSERT INTO data_records (upload_id, row_index, column_data) VALUES (?, ?, ?)",
            )
            .bind(upload_id)
            .bind(row_index as i64)
            .bind(column_data)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to save data record: {}", e)))?;

            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to commit data records: {}", e)))?;

        debug!(upload_id, inserted, "Data records saved");
        Ok(inserted)
    }

    /// Rows of an upload in their original order. Unknown ids yield no rows.
    pub async fn get_data_records(&self, upload_id: i64) -> Result<Vec<Row>> {
        let pool = self.pool().await?;
        let records = sqlx::query_scalar::<_, String>(
            "SELECT column_data FROM data_records WHERE upload_id = ? ORDER BY row_index ASC",
        )
        .bind(upload_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to fetch data records: {}", e)))?;

        records
            .iter()
            .map(|json| {
                serde_json::from_str(json).map_err(|e| {
                    AppError::StorageFailure(format!("Corrupt data record: {}", e))
                })
            })
            .collect()
    }
}
