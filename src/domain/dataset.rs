// ============================================================
// DATASET TYPES
// ============================================================
// Row-sets produced by the tabular parser and stored per upload

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::AppError;

/// A single cell value.
///
/// Serialized untagged so JSON numbers, booleans and strings come back as the
/// same variant they were written from. Missing cells are `Text("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(text) if text.is_empty())
    }

    /// Numeric view of the cell; text is trimmed and parsed, anything
    /// non-finite or non-numeric is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Integer(value) => *value as f64,
            CellValue::Float(value) => *value,
            CellValue::Bool(_) => return None,
            CellValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(value) => write!(f, "{}", value),
            CellValue::Float(value) => write!(f, "{}", value),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

/// One row: column name to cell, in file column order.
pub type Row = IndexMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Xlsx,
    Xls,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
        }
    }

    /// Resolve the file type from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, AppError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        extension.parse().map_err(|_| {
            if extension.is_empty() {
                AppError::UnsupportedFileType("(none)".to_string())
            } else {
                AppError::UnsupportedFileType(format!(".{}", extension))
            }
        })
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "csv" => Ok(FileType::Csv),
            "xlsx" => Ok(FileType::Xlsx),
            "xls" => Ok(FileType::Xls),
            other => Err(AppError::UnsupportedFileType(other.to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of parsing one file.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub rows: Vec<Row>,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub file_type: FileType,
}
