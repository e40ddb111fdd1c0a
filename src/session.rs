use crate::data::filter::{self, FilterSpec};
use crate::data::model::Table;
use crate::transform::{self, TransformOp};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One user interaction cycle over a loaded table.
///
/// An explicit alternative to keeping the working table in ambient global
/// state: the presentation layer owns a `Session`, feeds it a source table
/// and a filter, and reads `table()` back after every change. The pristine
/// source is kept so each pass recomputes from it instead of stacking
/// mutations.
pub struct Session {
    /// Loaded dataset, untouched by filtering or transforms.
    source: Table,

    /// Active filter predicates.
    filter: FilterSpec,

    /// Source with the filter applied (cached).
    filtered: Table,

    /// Status / error message to surface next to the table.
    status_message: Option<String>,
}

impl Session {
    pub fn new(source: Table) -> Self {
        let filtered = source.clone();
        Session {
            source,
            filter: FilterSpec::default(),
            filtered,
            status_message: None,
        }
    }

    /// The table the user currently sees.
    pub fn table(&self) -> &Table {
        &self.filtered
    }

    pub fn source(&self) -> &Table {
        &self.source
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Ingest a newly loaded table, dropping filter and status.
    pub fn set_table(&mut self, table: Table) {
        self.filter = FilterSpec::default();
        self.filtered = table.clone();
        self.source = table;
        self.status_message = None;
    }

    /// Replace the filter and recompute the view from the pristine source.
    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.filter = spec;
        self.refilter();
    }

    /// Recompute the filtered view after a filter change.
    pub fn refilter(&mut self) {
        self.filtered = filter::apply(&self.source, &self.filter);
    }

    /// Run one transform over the current view.
    ///
    /// On success the result becomes the current table and a short status
    /// describes what changed. On failure the previous table stays visible
    /// and the error text is recorded instead — nothing is fatal here.
    pub fn apply_transform(&mut self, op: &TransformOp) -> bool {
        match transform::apply(&self.filtered, op) {
            Ok(result) => {
                self.status_message = Some(describe(op, &result));
                self.filtered = result.table;
                true
            }
            Err(e) => {
                log::warn!("transform failed: {e}");
                self.status_message = Some(e.to_string());
                false
            }
        }
    }

    /// Discard transforms: back to the filtered source.
    pub fn reset(&mut self) {
        self.refilter();
        self.status_message = None;
    }
}

fn describe(op: &TransformOp, result: &transform::Transformed) -> String {
    let mut msg = match op {
        TransformOp::Deduplicate => {
            format!("removed {} duplicate rows", result.rows_removed)
        }
        TransformOp::FillMissing(strategy) => {
            format!("filled missing values with column {strategy:?}").to_lowercase()
        }
        TransformOp::DropMissing(_) => {
            format!("dropped {} rows with missing values", result.rows_removed)
        }
        TransformOp::Normalize(_) => "normalized numeric columns to [0, 1]".to_string(),
        TransformOp::Standardize(_) => "standardized numeric columns (z-score)".to_string(),
        TransformOp::Sample { size, .. } => format!("sampled {size} rows"),
    };
    if !result.constant_columns.is_empty() {
        msg.push_str(&format!(
            " (constant columns set to 0: {})",
            result.constant_columns.join(", ")
        ));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Row};

    fn table() -> Table {
        let rows = (0..4)
            .map(|i| {
                let mut row = Row::new();
                row.insert("x".into(), CellValue::Integer(i));
                row
            })
            .collect();
        Table::from_rows(vec!["x".into()], rows)
    }

    #[test]
    fn failed_transform_leaves_the_view_intact() {
        let mut session = Session::new(table());
        let before = session.table().clone();
        let ok = session.apply_transform(&TransformOp::Sample { size: 100, seed: 1 });
        assert!(!ok);
        assert_eq!(session.table(), &before);
        assert!(session.status_message().unwrap().contains("exceeds"));
    }

    #[test]
    fn successful_transform_replaces_the_view_and_reset_undoes_it() {
        let mut session = Session::new(table());
        assert!(session.apply_transform(&TransformOp::Sample { size: 2, seed: 1 }));
        assert_eq!(session.table().len(), 2);
        session.reset();
        assert_eq!(session.table().len(), 4);
        assert!(session.status_message().is_none());
    }
}
