//! Statistics engine: descriptive summaries and trend analysis over the
//! filtered table. Everything here is recomputed from scratch per request;
//! nothing is cached or persisted.

pub mod descriptive;
pub mod trend;

pub use descriptive::{column_summary, summary, ColumnSummary};
pub use trend::{fit_trend, trend_over_dates, TrendDirection, TrendResult};
