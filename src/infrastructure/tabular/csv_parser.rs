// ============================================================
// CSV PARSER
// ============================================================
// Decode CSV bytes with an ordered list of candidate encodings

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, BIG5, UTF_8, WINDOWS_1252};
use tracing::debug;

use super::normalize::{infer_column_cells, normalize_headers};
use super::RawTable;
use crate::domain::error::AppError;

/// Encodings tried in order. Windows-1252 accepts every byte sequence, so it
/// acts as the permissive fallback.
pub const CSV_ENCODINGS: [&Encoding; 3] = [UTF_8, BIG5, WINDOWS_1252];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV parser with encoding fallback
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Candidate encodings, first match wins
    encodings: Vec<&'static Encoding>,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encodings: CSV_ENCODINGS.to_vec(),
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replace the candidate encoding list
    pub fn with_encodings(mut self, encodings: Vec<&'static Encoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Parse raw CSV bytes, trying each encoding until one both decodes and
    /// tokenizes. Fails with the last error when every candidate fails.
    pub fn parse(&self, content: &[u8]) -> Result<RawTable, AppError> {
        let mut last_error: Option<String> = None;

        for encoding in &self.encodings {
            let attempt = Self::decode(content, encoding)
                .and_then(|text| self.parse_content(&text));

            match attempt {
                Ok(table) => {
                    debug!(encoding = encoding.name(), "CSV decoded");
                    return Ok(table);
                }
                Err(err) => {
                    debug!(encoding = encoding.name(), error = %err, "CSV decode attempt failed");
                    last_error = Some(err);
                }
            }
        }

        Err(AppError::UnparsableFile(last_error.unwrap_or_else(|| {
            "no candidate encodings configured".to_string()
        })))
    }

    fn decode(content: &[u8], encoding: &'static Encoding) -> Result<String, String> {
        let bytes = if encoding == UTF_8 {
            content.strip_prefix(UTF8_BOM).unwrap_or(content)
        } else {
            content
        };

        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| format!("'{}' codec can't decode the file", encoding.name()))
    }

    /// Tokenize decoded CSV text. The first record is the header.
    pub fn parse_content(&self, content: &str) -> Result<RawTable, String> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Short rows are padded below
            .from_reader(content.as_bytes());

        let mut header: Option<StringRecord> = None;
        let mut grid: Vec<Vec<String>> = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| format!("Failed to read CSV record: {}", e))?;
            if is_blank_line(&record) {
                continue;
            }

            let expected = match &header {
                Some(header) => header.len(),
                None => {
                    header = Some(record);
                    continue;
                }
            };

            if record.len() > expected {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(format!(
                    "Error tokenizing data. Expected {} fields in line {}, saw {}",
                    expected,
                    line,
                    record.len()
                ));
            }

            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(expected, String::new());
            grid.push(row);
        }

        let header = header.ok_or_else(|| "No columns to parse from file".to_string())?;
        let headers = normalize_headers(header.iter().map(|h| h.to_string()).collect());
        let rows = infer_column_cells(grid, headers.len());

        Ok(RawTable { headers, rows })
    }
}

fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).map(|f| f.trim().is_empty()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::CellValue;

    #[test]
    fn test_parse_simple_csv() {
        let table = CsvParser::new()
            .parse(b"name,age,city\nAlice,30,NYC\nBob,25,LA")
            .unwrap();

        assert_eq!(table.headers, vec!["name", "age", "city"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("Alice".to_string()));
        assert_eq!(table.rows[0][1], CellValue::Integer(30));
        assert_eq!(table.rows[1][2], CellValue::Text("LA".to_string()));
    }

    #[test]
    fn test_strips_utf8_bom_and_header_whitespace() {
        let table = CsvParser::new()
            .parse(b"\xEF\xBB\xBF  id , score \n1,2.5\n")
            .unwrap();
        assert_eq!(table.headers, vec!["id", "score"]);
        assert_eq!(table.rows[0][1], CellValue::Float(2.5));
    }

    #[test]
    fn test_big5_fallback() {
        let (encoded, _, had_errors) = BIG5.encode("城市,人口\n台北,250\n");
        assert!(!had_errors);
        assert!(std::str::from_utf8(&encoded).is_err());

        let table = CsvParser::new().parse(&encoded).unwrap();
        assert_eq!(table.headers, vec!["城市", "人口"]);
        assert_eq!(table.rows[0][0], CellValue::Text("台北".to_string()));
        assert_eq!(table.rows[0][1], CellValue::Integer(250));
    }

    #[test]
    fn test_single_byte_fallback() {
        // 0xE9 is 'é' in Windows-1252; invalid as UTF-8 and as Big5 lead byte pair
        let table = CsvParser::new().parse(b"caf\xE9\n1\n").unwrap();
        assert_eq!(table.headers, vec!["café"]);
    }

    #[test]
    fn test_short_rows_padded_with_empty() {
        let table = CsvParser::new().parse(b"a,b,c\n1\n").unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert!(table.rows[0][1].is_empty());
        assert!(table.rows[0][2].is_empty());
    }

    #[test]
    fn test_long_row_fails_with_last_error() {
        let err = CsvParser::new().parse(b"a,b\n1,2,3\n").unwrap_err();
        match err {
            AppError::UnparsableFile(msg) => {
                assert!(msg.contains("Expected 2 fields in line 2, saw 3"), "{}", msg)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_input_has_no_columns() {
        let err = CsvParser::new().parse(b"\n\n").unwrap_err();
        assert!(matches!(err, AppError::UnparsableFile(msg) if msg.contains("No columns")));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = CsvParser::new().parse(b"a\n\n1\n\n2\n").unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_custom_delimiter() {
        let table = CsvParser::new()
            .with_delimiter(b';')
            .parse(b"x;y\n1;2\n")
            .unwrap();
        assert_eq!(table.headers, vec!["x", "y"]);
    }

    #[test]
    fn test_empty_encoding_list() {
        let err = CsvParser::new().with_encodings(Vec::new()).parse(b"a\n1").unwrap_err();
        assert!(matches!(err, AppError::UnparsableFile(_)));
    }
}
