use crate::application::use_cases::statistics::summarize;
use crate::domain::dataset::ParsedTable;
use crate::domain::error::Result;
use crate::domain::statistics::StatisticsSummary;
use crate::domain::upload::NewUpload;
use crate::infrastructure::db::upload_store::UploadRepository;
use crate::infrastructure::storage::UploadStorage;
use crate::infrastructure::tabular;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything produced by one accepted upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub upload_id: i64,
    pub original_filename: String,
    pub table: ParsedTable,
    pub statistics: StatisticsSummary,
}

pub struct UploadUseCase {
    repository: Arc<UploadRepository>,
    storage: Arc<UploadStorage>,
}

impl UploadUseCase {
    pub fn new(repository: Arc<UploadRepository>, storage: Arc<UploadStorage>) -> Self {
        Self {
            repository,
            storage,
        }
    }

    /// Parse, summarize, keep the file and persist upload, rows and
    /// statistics. Nothing is written unless parsing succeeds.
    pub async fn execute(&self, original_filename: &str, content: &[u8]) -> Result<UploadOutcome> {
        let table = tabular::parse(content, original_filename)?;
        let statistics = summarize(&table.rows);

        let stored_filename = self.storage.save(original_filename, content).await?;

        let saved = self
            .repository
            .save_upload(&NewUpload {
                stored_filename: stored_filename.clone(),
                original_filename: original_filename.to_string(),
                file_type: table.file_type,
                upload_time: Utc::now(),
                row_count: table.row_count as i64,
                column_count: table.column_count as i64,
            })
            .await;
        let upload_id = match saved {
            Ok(id) => id,
            Err(err) => {
                self.discard_file(&stored_filename).await;
                return Err(err);
            }
        };

        if let Err(err) = self.persist_derived(upload_id, &table, &statistics).await {
            // Drop the half-written upload so no owner exists without its rows.
            if let Err(cleanup) = self.repository.delete_upload(upload_id).await {
                warn!(upload_id, error = %cleanup, "Failed to remove incomplete upload");
            }
            self.discard_file(&stored_filename).await;
            return Err(err);
        }

        info!(
            upload_id,
            file = original_filename,
            rows = table.row_count,
            columns = table.column_count,
            "Upload stored"
        );

        Ok(UploadOutcome {
            upload_id,
            original_filename: original_filename.to_string(),
            table,
            statistics,
        })
    }

    async fn persist_derived(
        &self,
        upload_id: i64,
        table: &ParsedTable,
        statistics: &StatisticsSummary,
    ) -> Result<()> {
        self.repository
            .save_data_records(upload_id, &table.rows)
            .await?;
        self.repository.save_statistics(upload_id, statistics).await?;
        Ok(())
    }

    async fn discard_file(&self, stored_filename: &str) {
        if let Err(e) = self.storage.remove(stored_filename).await {
            warn!(file = stored_filename, error = %e, "Failed to remove stored upload file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{CellValue, FileType};
    use crate::domain::error::AppError;
    use crate::infrastructure::db::upload_store::test_support::memory_repository;

    fn use_case(dir: &tempfile::TempDir) -> (UploadUseCase, Arc<UploadRepository>) {
        let repository = Arc::new(memory_repository());
        let storage = Arc::new(UploadStorage::new(dir.path()));
        (UploadUseCase::new(repository.clone(), storage), repository)
    }

    #[tokio::test]
    async fn test_upload_persists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, repository) = use_case(&dir);

        let outcome = use_case
            .execute("scores.csv", b"name,score\nann,1\nbo,2\ncy,x\n")
            .await
            .unwrap();

        assert_eq!(outcome.table.row_count, 3);
        assert_eq!(outcome.statistics["score"].count, 2);
        assert_eq!(outcome.statistics["score"].mean, 1.5);

        let upload = repository.get_upload(outcome.upload_id).await.unwrap().unwrap();
        assert_eq!(upload.original_filename, "scores.csv");
        assert_eq!(upload.file_type, FileType::Csv);
        assert_eq!(upload.row_count, 3);
        assert_eq!(upload.column_count, 2);
        assert!(dir.path().join(&upload.stored_filename).exists());

        let rows = repository.get_data_records(outcome.upload_id).await.unwrap();
        assert_eq!(rows, outcome.table.rows);
        assert_eq!(rows[2]["score"], CellValue::Text("x".to_string()));

        let snapshot = repository.get_statistics(outcome.upload_id).await.unwrap().unwrap();
        assert_eq!(snapshot.statistics_data, outcome.statistics);
    }

    #[tokio::test]
    async fn test_rejected_files_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, repository) = use_case(&dir);

        let err = use_case.execute("notes.txt", b"hello").await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
        let err = use_case.execute("empty.csv", b"").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyFile));

        assert!(repository.get_all_uploads().await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_persistence_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let repository = Arc::new(UploadRepository::in_memory(dir.path().join("missing.sql")));
        let use_case = UploadUseCase::new(repository, Arc::new(UploadStorage::new(&uploads)));

        let err = use_case
            .execute("sales.csv", b"region,sales\nnorth,10\n")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SchemaMissing(_)));
        assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_extreme_values_survive_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, repository) = use_case(&dir);

        let outcome = use_case
            .execute("big.csv", b"v,w\n1e305,1e200\n2e305,-1e200\n")
            .await
            .unwrap();

        let snapshot = repository.get_statistics(outcome.upload_id).await.unwrap().unwrap();
        let close = |a: f64, b: f64| (a / b - 1.0).abs() < 1e-12;
        let v = snapshot.statistics_data["v"];
        assert_eq!(v.count, 2);
        assert!(close(v.max, 2e305));
        assert!(close(v.mean, 1.5e305));
        assert!(close(v.std_dev, 0.5e305));
        let w = snapshot.statistics_data["w"];
        assert_eq!(w.mean, 0.0);
        assert!(close(w.std_dev, 1e200));
    }
}
