use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::Table;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ColumnSummary – descriptive statistics for one numeric column
// ---------------------------------------------------------------------------

/// Summary and advanced statistics over the non-null values of a column.
///
/// Statistics that need a spread estimate (`std_dev`, `variance`,
/// `skewness`, `kurtosis`, `cv`) are `None` when the column has too few
/// values to define them — an explicit "insufficient data" marker, never a
/// silent zero or NaN. `cv` is also `None` when the mean is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Sample standard deviation (n − 1 denominator). Needs ≥ 2 values.
    pub std_dev: Option<f64>,
    pub variance: Option<f64>,
    /// Bias-adjusted sample skewness. Needs ≥ 3 values and non-zero spread.
    pub skewness: Option<f64>,
    /// Bias-adjusted excess kurtosis. Needs ≥ 4 values and non-zero spread.
    pub kurtosis: Option<f64>,
    /// Coefficient of variation as a percentage of the mean.
    pub cv: Option<f64>,
    /// Values beyond the IQR fences `[q1 − 1.5·iqr, q3 + 1.5·iqr]`.
    pub outlier_count: usize,
    pub outlier_percentage: f64,
}

/// Compute the summary for one numeric column.
///
/// Errors: unknown column, non-numeric column, or no non-null values.
pub fn column_summary(table: &Table, column: &str) -> Result<ColumnSummary> {
    if !table.has_column(column) {
        return Err(Error::UnknownColumn(column.to_string()));
    }
    if !table.numeric_columns().iter().any(|c| c == column) {
        return Err(Error::NotNumeric(column.to_string()));
    }

    let mut values = table.numeric_values(column);
    if values.is_empty() {
        return Err(Error::InsufficientData("column has no non-null values"));
    }
    values.sort_by(f64::total_cmp);
    Ok(summarize_sorted(&values))
}

/// Summaries for every numeric column of the table.
///
/// Columns without any non-null value are skipped; an empty table is an
/// error so the caller can show a validation message instead of a blank grid.
pub fn summary(table: &Table) -> Result<BTreeMap<String, ColumnSummary>> {
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    Ok(table
        .numeric_columns()
        .into_iter()
        .filter_map(|col| column_summary(table, &col).ok().map(|s| (col, s)))
        .collect())
}

fn summarize_sorted(values: &[f64]) -> ColumnSummary {
    let n = values.len();
    let nf = n as f64;
    let min = values[0];
    let max = values[n - 1];
    let mean = values.iter().sum::<f64>() / nf;
    let median = quantile_sorted(values, 0.5);
    let q1 = quantile_sorted(values, 0.25);
    let q3 = quantile_sorted(values, 0.75);
    let iqr = q3 - q1;

    // Central moments about the mean.
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / nf;

    let variance = if n >= 2 {
        Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0))
    } else {
        None
    };
    let std_dev = variance.map(f64::sqrt);

    let skewness = if n >= 3 && m2 > 0.0 {
        let g1 = m3 / m2.powf(1.5);
        Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
    } else {
        None
    };

    let kurtosis = if n >= 4 && m2 > 0.0 {
        let g2 = m4 / (m2 * m2) - 3.0;
        Some(((nf + 1.0) * g2 + 6.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0)))
    } else {
        None
    };

    let cv = match std_dev {
        Some(sd) if mean != 0.0 => Some(sd / mean * 100.0),
        _ => None,
    };

    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    let outlier_count = values.iter().filter(|v| **v < lower || **v > upper).count();

    ColumnSummary {
        count: n,
        mean,
        median,
        mode: mode_sorted(values),
        min,
        max,
        range: max - min,
        q1,
        q3,
        iqr,
        std_dev,
        variance,
        skewness,
        kurtosis,
        cv,
        outlier_count,
        outlier_percentage: outlier_count as f64 / nf * 100.0,
    }
}

/// Linear-interpolated quantile of a sorted slice (dataframe convention).
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Most frequent value; ties resolve to the smallest.
fn mode_sorted(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j].total_cmp(&sorted[i]).is_eq() {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}
