use crate::domain::dataset::Row;
use crate::domain::statistics::{ColumnSummary, StatisticsSummary};

/// Above this magnitude squared deviations can overflow, so the column is
/// rescaled before computing moments.
const RESCALE_ABOVE: f64 = 1e100;

/// Round half-to-even at four decimal places. Integral values, which cover
/// every magnitude too large to scale, are returned as is.
pub fn round4(value: f64) -> f64 {
    if value.fract() == 0.0 {
        return value;
    }
    (value * 10_000.0).round_ties_even() / 10_000.0
}

/// Summarize every column seen in `rows`. Cells that do not coerce to a
/// finite number (including the empty marker and absent keys) are skipped,
/// not counted as zero.
pub fn summarize(rows: &[Row]) -> StatisticsSummary {
    let mut columns: StatisticsSummary = StatisticsSummary::new();
    if rows.is_empty() {
        return columns;
    }

    let mut values: indexmap::IndexMap<&str, Vec<f64>> = indexmap::IndexMap::new();
    for row in rows {
        for (column, cell) in row {
            let numbers = values.entry(column.as_str()).or_default();
            if let Some(number) = cell.as_f64() {
                numbers.push(number);
            }
        }
    }

    for (column, numbers) in values {
        columns.insert(column.to_string(), summarize_column(numbers));
    }

    columns
}

fn summarize_column(mut numbers: Vec<f64>) -> ColumnSummary {
    if numbers.is_empty() {
        return ColumnSummary::default();
    }

    numbers.sort_by(|a, b| a.total_cmp(b));

    let count = numbers.len();
    let n = count as f64;
    let min = numbers[0];
    let max = numbers[count - 1];

    let max_abs = min.abs().max(max.abs());
    let scale = if max_abs > RESCALE_ABOVE { max_abs } else { 1.0 };

    let scaled_mean = numbers.iter().map(|x| x / scale).sum::<f64>() / n;
    let variance = numbers
        .iter()
        .map(|x| (x / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / n;
    let mean = scaled_mean * scale;
    let std_dev = variance.sqrt() * scale;

    let median = if count % 2 == 1 {
        numbers[count / 2]
    } else {
        numbers[count / 2 - 1] / 2.0 + numbers[count / 2] / 2.0
    };

    // max - min overflows only when the column spans both ends of f64.
    let range = (max - min).min(f64::MAX);

    ColumnSummary {
        count: count as u64,
        mean: round4(mean),
        median: round4(median),
        std_dev: round4(std_dev),
        min: round4(min),
        max: round4(max),
        range: round4(range),
    }
}
