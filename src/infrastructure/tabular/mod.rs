// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// Raw upload bytes to a normalized row-set (CSV and Excel)

mod csv_parser;
mod excel_parser;
mod normalize;

pub use csv_parser::CsvParser;

use crate::domain::dataset::{CellValue, FileType, ParsedTable};
use crate::domain::error::{AppError, Result};
use normalize::build_rows;

/// Headers plus typed cells, before rows are keyed by header.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Parse an uploaded file. The extension decides the reader; only csv, xlsx
/// and xls are accepted. Pure: nothing is written anywhere.
pub fn parse(content: &[u8], filename: &str) -> Result<ParsedTable> {
    let file_type = FileType::from_filename(filename)?;
    if content.is_empty() {
        return Err(AppError::EmptyFile);
    }

    let raw = match file_type {
        FileType::Csv => CsvParser::default().parse(content)?,
        FileType::Xlsx | FileType::Xls => excel_parser::parse_workbook(content, file_type)?,
    };

    let rows = build_rows(&raw.headers, raw.rows);

    Ok(ParsedTable {
        row_count: rows.len(),
        column_count: raw.headers.len(),
        headers: raw.headers,
        rows,
        file_type,
    })
}
