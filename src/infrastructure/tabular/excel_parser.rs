use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use tracing::debug;

use super::normalize::normalize_headers;
use super::RawTable;
use crate::domain::dataset::{CellValue, FileType};
use crate::domain::error::AppError;

// Largest float that still converts to i64 exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Read the first worksheet of an xlsx/xls workbook. The first row holds the
/// headers.
pub fn parse_workbook(content: &[u8], file_type: FileType) -> Result<RawTable, AppError> {
    let cursor = Cursor::new(content);
    let range = match file_type {
        FileType::Xlsx => first_sheet(Xlsx::new(cursor).map_err(unparsable)?)?,
        FileType::Xls => first_sheet(Xls::new(cursor).map_err(unparsable)?)?,
        FileType::Csv => {
            return Err(AppError::UnparsableFile(
                "CSV content passed to the spreadsheet reader".to_string(),
            ))
        }
    };

    debug!(
        rows = range.height(),
        columns = range.width(),
        "Read first worksheet"
    );

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(AppError::UnparsableFile(
            "No columns to parse from file".to_string(),
        ));
    };

    let headers = normalize_headers(header_row.iter().map(header_text).collect());
    let rows = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn first_sheet<RS, R>(mut workbook: R) -> Result<Range<Data>, AppError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::UnparsableFile("No worksheet found".to_string()))?
        .map_err(unparsable)
}

fn unparsable(err: impl Display) -> AppError {
    AppError::UnparsableFile(format!("Failed to read workbook: {}", err))
}

fn integral(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER).then_some(value as i64)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(text) => text.clone(),
        Data::Float(value) => integral(*value)
            .map(|v| v.to_string())
            .unwrap_or_else(|| value.to_string()),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(value) => CellValue::Integer(*value),
        Data::Float(value) => integral(*value)
            .map(CellValue::Integer)
            .unwrap_or(CellValue::Float(*value)),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Empty | Data::Error(_) => CellValue::empty(),
        other => other
            .as_datetime()
            .map(|dt| CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or_else(|| CellValue::Text(other.to_string())),
    }
}
