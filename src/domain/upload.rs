use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dataset::FileType;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: i64,
    pub stored_filename: String,
    pub original_filename: String,
    pub file_type: FileType,
    pub upload_time: DateTime<Utc>,
    pub row_count: i64,
    pub column_count: i64,
    pub analysis_time: Option<DateTime<Utc>>,
}

/// Metadata for an upload that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub stored_filename: String,
    pub original_filename: String,
    pub file_type: FileType,
    pub upload_time: DateTime<Utc>,
    pub row_count: i64,
    pub column_count: i64,
}
