//! Functional core of an interactive analytics dashboard.
//!
//! The pipeline is a chain of pure stages over an in-memory [`Table`]:
//! load (synthetic or CSV/JSON) → filter → statistics / transform → export.
//! Every stage takes a table and returns a new one, so a UI can re-run the
//! whole chain from the pristine source on each interaction. Rendering,
//! widgets, and file-upload plumbing live in the presentation layer, not
//! here.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod session;
pub mod stats;
pub mod transform;

pub use data::filter::{category_options, DatePreset, DateRange, FilterSpec};
pub use data::loader::{generate_sample, load_csv_reader, load_file, load_json_reader, SampleConfig};
pub use data::model::{CellValue, QualityReport, Row, Table};
pub use error::{Error, Result};
pub use export::{export_chart_png, export_table, Artifact, ExportFormat};
pub use session::Session;
pub use stats::{column_summary, fit_trend, summary, trend_over_dates};
pub use transform::{FillStrategy, TransformOp, Transformed};
