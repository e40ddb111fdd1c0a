use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

use super::model::Table;

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// Date-range predicate over a named column, endpoints inclusive.
/// Validated at construction: `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(column: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(DateRange {
            column: column.into(),
            start,
            end,
        })
    }
}

/// Conjunction of predicates applied to a table.
///
/// A category column absent from `categories`, or present with an empty
/// allowed-set, means "no restriction" — an empty selection never hides the
/// whole table. Rows whose date cell is missing or unparseable are excluded
/// by an active date predicate rather than raising.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    /// Per-column allowed values: column_name → set of category strings.
    pub categories: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_category<I, S>(mut self, column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .insert(column.into(), allowed.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the spec restricts anything at all.
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.categories.values().all(|s| s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Return indices of rows that pass all active predicates.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            if let Some(range) = &spec.date_range {
                if table.has_column(&range.column) {
                    match row.get(&range.column).and_then(|v| v.as_date()) {
                        Some(d) if d >= range.start && d <= range.end => {}
                        // Missing or unparseable dates fall outside the range.
                        _ => return false,
                    }
                }
            }
            for (col, allowed) in &spec.categories {
                if allowed.is_empty() || !table.has_column(col) {
                    continue;
                }
                match row.get(col) {
                    Some(v) if !v.is_null() => {
                        if !allowed.contains(&v.to_string()) {
                            return false;
                        }
                    }
                    _ => return false,
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}

/// Apply the spec, producing a new table. The empty spec is the identity.
pub fn apply(table: &Table, spec: &FilterSpec) -> Table {
    let indices = filtered_indices(table, spec);
    let rows = indices
        .into_iter()
        .map(|i| table.rows[i].clone())
        .collect();
    Table::from_rows(table.columns.clone(), rows)
}

/// Distinct non-null values of a category column, sorted, capped at
/// [`config::MAX_FILTER_OPTIONS`][crate::config::MAX_FILTER_OPTIONS] so a
/// high-cardinality column cannot flood a picker.
pub fn category_options(table: &Table, column: &str) -> Vec<String> {
    table
        .unique_values
        .get(column)
        .map(|vals| {
            vals.iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .take(crate::config::MAX_FILTER_OPTIONS)
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Date presets
// ---------------------------------------------------------------------------

/// Quick relative date ranges offered next to the custom picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Last7Days,
    Last30Days,
    Last90Days,
    Last6Months,
    LastYear,
    ThisMonth,
    ThisYear,
}

impl DatePreset {
    /// Resolve the preset against a reference day (usually today).
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_back = |n: i64| today - chrono::Duration::days(n);
        match self {
            DatePreset::Last7Days => (days_back(7), today),
            DatePreset::Last30Days => (days_back(30), today),
            DatePreset::Last90Days => (days_back(90), today),
            DatePreset::Last6Months => (days_back(180), today),
            DatePreset::LastYear => (days_back(365), today),
            DatePreset::ThisMonth => (
                today.with_day(1).unwrap_or(today),
                today,
            ),
            DatePreset::ThisYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            ),
        }
    }

    /// Resolve and clamp to the data's span so presets never select outside
    /// the loaded table.
    pub fn clamped(&self, today: NaiveDate, min: NaiveDate, max: NaiveDate) -> (NaiveDate, NaiveDate) {
        let (start, end) = self.range(today);
        (start.max(min), end.min(max))
    }
}
