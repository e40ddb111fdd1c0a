use chrono::NaiveDate;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Crate-wide error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong in the pipeline.
///
/// Three families: malformed input, insufficient data for a statistic,
/// and operational misuse (e.g. oversampling). All of them are recoverable
/// at the stage boundary; none should abort the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("table is empty")]
    EmptyTable,

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("insufficient data: {0}")]
    InsufficientData(&'static str),

    #[error("series is constant, fit is degenerate")]
    ConstantSeries,

    #[error("sample size {requested} exceeds available rows ({available})")]
    SampleTooLarge { requested: usize, available: usize },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, Error>;
