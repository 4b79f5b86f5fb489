use crate::domain::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Executor, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

mod analyses;
mod entities;
mod records;
mod statistics;
mod uploads;

#[derive(Debug, Clone)]
enum StoreTarget {
    File(PathBuf),
    Memory,
}

/// Persistence for uploads, their rows, statistics snapshots and AI analyses.
///
/// All statements go through a single shared connection, so writes never
/// interleave and a running transaction excludes every other caller. The
/// connection is opened lazily on first use and can be closed and reopened.
pub struct UploadRepository {
    target: StoreTarget,
    schema_path: PathBuf,
    pool: Mutex<Option<SqlitePool>>,
}

impl UploadRepository {
    pub fn new(db_path: impl Into<PathBuf>, schema_path: impl Into<PathBuf>) -> Self {
        Self {
            target: StoreTarget::File(db_path.into()),
            schema_path: schema_path.into(),
            pool: Mutex::new(None),
        }
    }

    /// Private in-memory database; the schema is applied on connect.
    pub fn in_memory(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            target: StoreTarget::Memory,
            schema_path: schema_path.into(),
            pool: Mutex::new(None),
        }
    }

    /// Open the shared connection if it is not open yet.
    pub async fn connect(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            info!("Upload database closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    async fn pool(&self) -> Result<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = self.open().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn open(&self) -> Result<SqlitePool> {
        let (options, fresh) = match &self.target {
            StoreTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal);
                (options, !path.exists())
            }
            StoreTarget::Memory => {
                let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                    AppError::StorageFailure(format!("Failed to parse database URL: {}", e))
                })?;
                (options, true)
            }
        };

        // Read the schema before touching the database so a missing definition
        // never leaves an uninitialized file behind.
        let schema = if fresh {
            Some(load_schema(&self.schema_path)?)
        } else {
            None
        };

        let options = options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::StorageFailure(format!("Failed to connect: {}", e)))?;

        if let Some(schema) = schema {
            apply_schema(&pool, &schema).await?;
            info!(schema = %self.schema_path.display(), "Upload database schema applied");
        }

        match &self.target {
            StoreTarget::File(path) => info!(path = %path.display(), "Upload database opened"),
            StoreTarget::Memory => info!("In-memory upload database opened"),
        }

        Ok(pool)
    }
}

fn load_schema(schema_path: &Path) -> Result<String> {
    if !schema_path.exists() {
        warn!(schema = %schema_path.display(), "Schema definition not found");
        return Err(AppError::SchemaMissing(schema_path.display().to_string()));
    }
    Ok(std::fs::read_to_string(schema_path)?)
}

async fn apply_schema(pool: &SqlitePool, schema: &str) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to begin schema transaction: {}", e)))?;

    sqlx::raw_sql(schema)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to apply schema: {}", e)))?;

    tx.commit()
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to commit schema: {}", e)))
}

/// Fails with `NotFound` unless the upload row exists.
async fn ensure_upload_exists<'e, E>(executor: E, upload_id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM uploads WHERE id = ?")
        .bind(upload_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::StorageFailure(format!("Failed to look up upload: {}", e)))?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Upload not found: {}", upload_id))),
    }
}

// Fixed-width RFC 3339 keeps lexical order equal to time order.
fn to_db_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::StorageFailure(format!("Invalid stored timestamp {}: {}", value, e)))
}
