use std::collections::{HashMap, HashSet};

use crate::domain::dataset::{CellValue, Row};

/// Markers read as missing values in text sources.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trim headers, name blank ones `Unnamed: <index>` and suffix repeated names
/// with `.1`, `.2`, ... so every column keeps a distinct key.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (index, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        while used.contains(&candidate) {
            let counter = counters.entry(base.clone()).or_insert(0);
            *counter += 1;
            candidate = format!("{}.{}", base, counter);
        }

        used.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || NA_MARKERS.contains(&value)
}

#[derive(Clone, Copy)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

fn column_kind(grid: &[Vec<String>], column: usize) -> ColumnKind {
    let mut kind = ColumnKind::Integer;

    for value in grid.iter().filter_map(|row| row.get(column)) {
        let value = value.trim();
        if is_missing(value) {
            continue;
        }
        if matches!(kind, ColumnKind::Integer) && value.parse::<i64>().is_ok() {
            continue;
        }
        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => kind = ColumnKind::Float,
            _ => return ColumnKind::Text,
        }
    }

    kind
}

/// Type text cells column by column: a column is numeric only when every
/// non-missing cell parses. Missing cells always become the empty marker.
pub fn infer_column_cells(grid: Vec<Vec<String>>, width: usize) -> Vec<Vec<CellValue>> {
    let kinds: Vec<ColumnKind> = (0..width).map(|col| column_kind(&grid, col)).collect();

    grid.into_iter()
        .map(|row| {
            row.into_iter()
                .zip(kinds.iter())
                .map(|(value, kind)| {
                    let trimmed = value.trim();
                    if is_missing(trimmed) {
                        return CellValue::empty();
                    }
                    match kind {
                        ColumnKind::Integer => trimmed
                            .parse::<i64>()
                            .map(CellValue::Integer)
                            .unwrap_or(CellValue::Text(value)),
                        ColumnKind::Float => trimmed
                            .parse::<f64>()
                            .map(CellValue::Float)
                            .unwrap_or(CellValue::Text(value)),
                        ColumnKind::Text => CellValue::Text(value),
                    }
                })
                .collect()
        })
        .collect()
}

/// Zip typed cells with headers into rows; cells missing at the end of a row
/// become the empty marker.
pub fn build_rows(headers: &[String], cells: Vec<Vec<CellValue>>) -> Vec<Row> {
    cells
        .into_iter()
        .map(|row| {
            let mut values = row.into_iter();
            headers
                .iter()
                .map(|header| (header.clone(), values.next().unwrap_or_else(CellValue::empty)))
                .collect()
        })
        .collect()
}
