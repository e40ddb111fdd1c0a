use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell in the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Date(_) => 4,
                String(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

/// Plain textual form, also used by the CSV exporter (`Null` → empty field).
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric pipelines.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to interpret the value as a date. ISO-8601 strings are accepted
    /// so a text column with well-formed dates can still drive a date filter.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Float(_))
    }
}

// ---------------------------------------------------------------------------
// Row / Table – the record table
// ---------------------------------------------------------------------------

/// One record: column name → value.
pub type Row = BTreeMap<String, CellValue>;

/// The full in-memory table with pre-computed column indices.
///
/// Invariant: every row carries a value (possibly `Null`) for every entry of
/// `columns`, and `columns` preserves the original header order. Pipeline
/// stages replace tables rather than mutating them in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names in header order.
    pub columns: Vec<String>,
    /// All records.
    pub rows: Vec<Row>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl Table {
    /// Build a table, padding rows so the column set is uniform.
    pub fn from_rows(columns: Vec<String>, mut rows: Vec<Row>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();
        for row in &mut rows {
            row.retain(|k, _| columns.iter().any(|c| c == k));
            for col in &columns {
                let val = row.entry(col.clone()).or_insert(CellValue::Null);
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        Table {
            columns,
            rows,
            unique_values,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Columns whose non-null cells are all numeric (and at least one exists).
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|col| {
                let mut seen = false;
                for row in &self.rows {
                    match row.get(*col) {
                        Some(CellValue::Null) | None => {}
                        Some(v) if v.is_numeric() => seen = true,
                        Some(_) => return false,
                    }
                }
                seen
            })
            .cloned()
            .collect()
    }

    /// Columns holding text or boolean values.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|col| {
                self.rows.iter().any(|row| {
                    matches!(
                        row.get(*col),
                        Some(CellValue::String(_)) | Some(CellValue::Bool(_))
                    )
                })
            })
            .cloned()
            .collect()
    }

    /// Columns with at least one date-typed cell.
    pub fn date_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|col| {
                self.rows
                    .iter()
                    .any(|row| matches!(row.get(*col), Some(CellValue::Date(_))))
            })
            .cloned()
            .collect()
    }

    /// Non-null, finite numeric values of a column, in row order.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(CellValue::as_f64))
            .filter(|v| v.is_finite())
            .collect()
    }

    /// One row flattened into column order, for duplicate detection.
    pub(crate) fn row_key(&self, row: &Row) -> Vec<CellValue> {
        self.columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(CellValue::Null))
            .collect()
    }

    /// Data-quality metrics over the whole table.
    pub fn quality(&self) -> QualityReport {
        let total_rows = self.rows.len();
        let total_columns = self.columns.len();
        let cells = (total_rows * total_columns) as f64;

        let missing_values = self
            .rows
            .iter()
            .flat_map(|row| row.values())
            .filter(|v| v.is_null())
            .count();

        let mut seen: BTreeSet<Vec<CellValue>> = BTreeSet::new();
        let mut duplicate_rows = 0;
        for row in &self.rows {
            if !seen.insert(self.row_key(row)) {
                duplicate_rows += 1;
            }
        }

        QualityReport {
            total_rows,
            total_columns,
            missing_values,
            missing_percentage: if cells > 0.0 {
                missing_values as f64 / cells * 100.0
            } else {
                0.0
            },
            duplicate_rows,
            duplicate_percentage: if total_rows > 0 {
                duplicate_rows as f64 / total_rows as f64 * 100.0
            } else {
                0.0
            },
            numeric_columns: self.numeric_columns().len(),
            categorical_columns: self.categorical_columns().len(),
        }
    }
}

// ---------------------------------------------------------------------------
// QualityReport
// ---------------------------------------------------------------------------

/// Missing-value and duplicate metrics shown alongside the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: usize,
    pub missing_percentage: f64,
    pub duplicate_rows: usize,
    pub duplicate_percentage: f64,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn small_table() -> Table {
        Table::from_rows(
            vec!["region".into(), "sales".into()],
            vec![
                row(&[
                    ("region", CellValue::String("North".into())),
                    ("sales", CellValue::Float(10.0)),
                ]),
                row(&[
                    ("region", CellValue::String("South".into())),
                    ("sales", CellValue::Float(20.0)),
                ]),
                row(&[("region", CellValue::String("North".into()))]),
            ],
        )
    }

    #[test]
    fn from_rows_pads_missing_cells() {
        let t = small_table();
        assert_eq!(t.rows[2].get("sales"), Some(&CellValue::Null));
        assert!(t.unique_values["sales"].contains(&CellValue::Null));
    }

    #[test]
    fn column_classification() {
        let t = small_table();
        assert_eq!(t.numeric_columns(), vec!["sales".to_string()]);
        assert_eq!(t.categorical_columns(), vec!["region".to_string()]);
        assert!(t.date_columns().is_empty());
    }

    #[test]
    fn quality_counts_missing_and_duplicates() {
        let t = Table::from_rows(
            vec!["a".into()],
            vec![
                row(&[("a", CellValue::Integer(1))]),
                row(&[("a", CellValue::Integer(1))]),
                row(&[("a", CellValue::Null)]),
            ],
        );
        let q = t.quality();
        assert_eq!(q.duplicate_rows, 1);
        assert_eq!(q.missing_values, 1);
        assert_eq!(q.total_rows, 3);
        assert!((q.missing_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn cell_value_date_parsing() {
        assert_eq!(
            CellValue::String("2023-06-01".into()).as_date(),
            NaiveDate::from_ymd_opt(2023, 6, 1)
        );
        assert_eq!(CellValue::String("junk".into()).as_date(), None);
    }
}
