use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::model::{CellValue, Table};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Transform stage: pure table → table operations
// ---------------------------------------------------------------------------

/// How missing numeric entries are imputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    Mean,
    Median,
}

/// One transformation request, dispatched by [`apply`].
///
/// `None` column selections mean "all numeric columns" (for the scalers)
/// or "all columns" (for `DropMissing`).
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    Deduplicate,
    FillMissing(FillStrategy),
    DropMissing(Option<Vec<String>>),
    Normalize(Option<Vec<String>>),
    Standardize(Option<Vec<String>>),
    Sample { size: usize, seed: u64 },
}

/// Result of a transformation: the new table plus what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub table: Table,
    /// Rows dropped by deduplication, missing-value removal, or sampling.
    pub rows_removed: usize,
    /// Columns whose values were all equal, mapped to 0 by the scalers.
    pub constant_columns: Vec<String>,
}

impl Transformed {
    fn plain(table: Table) -> Self {
        Transformed {
            table,
            rows_removed: 0,
            constant_columns: Vec::new(),
        }
    }
}

/// Dispatch a [`TransformOp`]. Inputs are never mutated; undo is re-running
/// the pipeline from the filtered source.
pub fn apply(table: &Table, op: &TransformOp) -> Result<Transformed> {
    match op {
        TransformOp::Deduplicate => Ok(deduplicate(table)),
        TransformOp::FillMissing(strategy) => Ok(fill_missing(table, *strategy)),
        TransformOp::DropMissing(columns) => drop_missing(table, columns.as_deref()),
        TransformOp::Normalize(columns) => normalize(table, columns.as_deref()),
        TransformOp::Standardize(columns) => standardize(table, columns.as_deref()),
        TransformOp::Sample { size, seed } => sample(table, *size, *seed),
    }
}

/// Remove rows that are exact duplicates across all columns, keeping the
/// first occurrence.
pub fn deduplicate(table: &Table) -> Transformed {
    let mut seen: BTreeSet<Vec<CellValue>> = BTreeSet::new();
    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| seen.insert(table.row_key(row)))
        .cloned()
        .collect();

    let removed = table.rows.len() - rows.len();
    if removed > 0 {
        log::info!("deduplicate: removed {removed} duplicate rows");
    }
    Transformed {
        table: Table::from_rows(table.columns.clone(), rows),
        rows_removed: removed,
        constant_columns: Vec::new(),
    }
}

/// Replace missing entries of every numeric column with the column mean or
/// median. Non-numeric columns are deliberately left untouched; use
/// [`drop_missing`] to remove their incomplete rows instead.
pub fn fill_missing(table: &Table, strategy: FillStrategy) -> Transformed {
    let mut rows = table.rows.clone();
    for col in table.numeric_columns() {
        let mut values = table.numeric_values(&col);
        if values.is_empty() {
            continue;
        }
        let fill = match strategy {
            FillStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            FillStrategy::Median => {
                values.sort_by(f64::total_cmp);
                let n = values.len();
                if n % 2 == 0 {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                } else {
                    values[n / 2]
                }
            }
        };
        for row in &mut rows {
            if row.get(&col).map_or(true, CellValue::is_null) {
                row.insert(col.clone(), CellValue::Float(fill));
            }
        }
    }
    Transformed::plain(Table::from_rows(table.columns.clone(), rows))
}

/// Remove rows with at least one missing value in the given columns
/// (default: all columns).
pub fn drop_missing(table: &Table, columns: Option<&[String]>) -> Result<Transformed> {
    let subset: Vec<String> = match columns {
        Some(cols) => {
            for col in cols {
                if !table.has_column(col) {
                    return Err(Error::UnknownColumn(col.clone()));
                }
            }
            cols.to_vec()
        }
        None => table.columns.clone(),
    };

    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|row| {
            subset
                .iter()
                .all(|col| row.get(col).is_some_and(|v| !v.is_null()))
        })
        .cloned()
        .collect();

    let removed = table.rows.len() - rows.len();
    Ok(Transformed {
        table: Table::from_rows(table.columns.clone(), rows),
        rows_removed: removed,
        constant_columns: Vec::new(),
    })
}

/// Min-max rescale the selected numeric columns to `[0, 1]`. A constant
/// column maps to 0 everywhere and is reported in `constant_columns`.
pub fn normalize(table: &Table, columns: Option<&[String]>) -> Result<Transformed> {
    scale(table, columns, |values| {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == min {
            None
        } else {
            Some(Box::new(move |v| (v - min) / (max - min)))
        }
    })
}

/// Z-score the selected numeric columns. A zero-spread column maps to 0
/// everywhere and is reported in `constant_columns`.
pub fn standardize(table: &Table, columns: Option<&[String]>) -> Result<Transformed> {
    scale(table, columns, |values| {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        if n < 2.0 {
            return None;
        }
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        if std == 0.0 {
            None
        } else {
            Some(Box::new(move |v| (v - mean) / std))
        }
    })
}

type ScaleFn = Box<dyn Fn(f64) -> f64>;

/// Shared driver for the two scalers: `make_scaler` returns `None` for a
/// constant column, which then maps to 0 and gets flagged.
fn scale<F>(table: &Table, columns: Option<&[String]>, make_scaler: F) -> Result<Transformed>
where
    F: Fn(&[f64]) -> Option<ScaleFn>,
{
    let numeric = table.numeric_columns();
    let targets: Vec<String> = match columns {
        Some(cols) => {
            for col in cols {
                if !table.has_column(col) {
                    return Err(Error::UnknownColumn(col.clone()));
                }
                if !numeric.iter().any(|c| c == col) {
                    return Err(Error::NotNumeric(col.clone()));
                }
            }
            cols.to_vec()
        }
        None => numeric,
    };

    let mut rows = table.rows.clone();
    let mut constant_columns = Vec::new();

    for col in &targets {
        let values = table.numeric_values(col);
        if values.is_empty() {
            continue;
        }
        let scaler: ScaleFn = match make_scaler(&values) {
            Some(f) => f,
            None => {
                constant_columns.push(col.clone());
                Box::new(|_| 0.0)
            }
        };
        for row in &mut rows {
            if let Some(v) = row.get(col).and_then(CellValue::as_f64) {
                row.insert(col.clone(), CellValue::Float(scaler(v)));
            }
        }
    }

    Ok(Transformed {
        table: Table::from_rows(table.columns.clone(), rows),
        rows_removed: 0,
        constant_columns,
    })
}

/// Draw a uniform random subset of `size` rows without replacement.
/// Deterministic for a given seed; oversampling is a validation error.
pub fn sample(table: &Table, size: usize, seed: u64) -> Result<Transformed> {
    if size > table.len() {
        return Err(Error::SampleTooLarge {
            requested: size,
            available: table.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let picked = rand::seq::index::sample(&mut rng, table.len(), size);
    let rows: Vec<_> = picked.iter().map(|i| table.rows[i].clone()).collect();

    let removed = table.len() - size;
    Ok(Transformed {
        table: Table::from_rows(table.columns.clone(), rows),
        rows_removed: removed,
        constant_columns: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;

    fn table_of(values: &[Option<f64>]) -> Table {
        let rows = values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert(
                    "x".into(),
                    match v {
                        Some(f) => CellValue::Float(*f),
                        None => CellValue::Null,
                    },
                );
                row
            })
            .collect();
        Table::from_rows(vec!["x".into()], rows)
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let t = table_of(&[Some(1.0), Some(1.0), Some(2.0), Some(1.0)]);
        let once = deduplicate(&t);
        assert_eq!(once.rows_removed, 2);
        assert_eq!(once.table.len(), 2);
        let twice = deduplicate(&once.table);
        assert_eq!(twice.rows_removed, 0);
        assert_eq!(twice.table, once.table);
    }

    #[test]
    fn fill_missing_mean_and_median() {
        let t = table_of(&[Some(1.0), Some(2.0), Some(9.0), None]);
        let mean = fill_missing(&t, FillStrategy::Mean);
        assert_eq!(mean.table.rows[3]["x"], CellValue::Float(4.0));
        let median = fill_missing(&t, FillStrategy::Median);
        assert_eq!(median.table.rows[3]["x"], CellValue::Float(2.0));
    }

    #[test]
    fn fill_missing_leaves_text_columns_alone() {
        let mut r1 = Row::new();
        r1.insert("label".into(), CellValue::String("a".into()));
        let mut r2 = Row::new();
        r2.insert("label".into(), CellValue::Null);
        let t = Table::from_rows(vec!["label".into()], vec![r1, r2]);
        let filled = fill_missing(&t, FillStrategy::Mean);
        assert_eq!(filled.table.rows[1]["label"], CellValue::Null);
    }

    #[test]
    fn drop_missing_honours_column_subset() {
        let mk = |a: Option<f64>, b: Option<f64>| {
            let mut row = Row::new();
            row.insert("a".into(), a.map_or(CellValue::Null, CellValue::Float));
            row.insert("b".into(), b.map_or(CellValue::Null, CellValue::Float));
            row
        };
        let t = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![mk(Some(1.0), None), mk(None, Some(2.0)), mk(Some(3.0), Some(4.0))],
        );

        let all = drop_missing(&t, None).unwrap();
        assert_eq!(all.table.len(), 1);
        assert_eq!(all.rows_removed, 2);

        let only_a = drop_missing(&t, Some(&["a".to_string()])).unwrap();
        assert_eq!(only_a.table.len(), 2);

        assert!(matches!(
            drop_missing(&t, Some(&["zzz".to_string()])),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn normalize_spans_zero_to_one() {
        let t = table_of(&[Some(10.0), Some(20.0), Some(30.0)]);
        let out = normalize(&t, None).unwrap();
        let vals = out.table.numeric_values("x");
        assert_eq!(vals, vec![0.0, 0.5, 1.0]);
        assert!(out.constant_columns.is_empty());
    }

    #[test]
    fn normalize_flags_constant_column() {
        let t = table_of(&[Some(7.0), Some(7.0)]);
        let out = normalize(&t, None).unwrap();
        assert_eq!(out.table.numeric_values("x"), vec![0.0, 0.0]);
        assert_eq!(out.constant_columns, vec!["x".to_string()]);
    }

    #[test]
    fn standardize_centers_and_scales() {
        let t = table_of(&[Some(2.0), Some(4.0), Some(6.0)]);
        let out = standardize(&t, None).unwrap();
        let vals = out.table.numeric_values("x");
        let mean = vals.iter().sum::<f64>() / vals.len() as f64;
        let std = (vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (vals.len() as f64 - 1.0))
            .sqrt();
        assert!(mean.abs() < 1e-12);
        assert!((std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn standardize_flags_zero_spread() {
        let t = table_of(&[Some(5.0), Some(5.0), Some(5.0)]);
        let out = standardize(&t, None).unwrap();
        assert_eq!(out.table.numeric_values("x"), vec![0.0, 0.0, 0.0]);
        assert_eq!(out.constant_columns, vec!["x".to_string()]);
    }

    #[test]
    fn scalers_skip_null_cells() {
        let t = table_of(&[Some(0.0), None, Some(10.0)]);
        let out = normalize(&t, None).unwrap();
        assert_eq!(out.table.rows[1]["x"], CellValue::Null);
    }

    #[test]
    fn scaler_rejects_non_numeric_selection() {
        let mut row = Row::new();
        row.insert("label".into(), CellValue::String("a".into()));
        let t = Table::from_rows(vec!["label".into()], vec![row]);
        assert!(matches!(
            normalize(&t, Some(&["label".to_string()])),
            Err(Error::NotNumeric(_))
        ));
    }

    #[test]
    fn oversampling_is_rejected() {
        let t = table_of(&[Some(1.0), Some(2.0)]);
        assert!(matches!(
            sample(&t, 3, 42),
            Err(Error::SampleTooLarge { requested: 3, available: 2 })
        ));
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let t = table_of(&(0..100).map(|i| Some(i as f64)).collect::<Vec<_>>());
        let a = sample(&t, 10, 7).unwrap();
        let b = sample(&t, 10, 7).unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.rows_removed, 90);
        assert_eq!(a.table.len(), 10);
    }

    #[test]
    fn dispatcher_routes_ops() {
        let t = table_of(&[Some(1.0), Some(1.0)]);
        let out = apply(&t, &TransformOp::Deduplicate).unwrap();
        assert_eq!(out.table.len(), 1);
    }
}
