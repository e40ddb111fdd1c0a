use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value as JsonValue;

use crate::config;

use super::model::{CellValue, Row, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – UTF-8, comma-delimited, header row required
/// * `.json` – records orientation: `[{ "col": value, ... }, ...]`
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV file")?;
            load_csv_reader(file)
        }
        "json" => {
            let file = std::fs::File::open(path).context("opening JSON file")?;
            load_json_reader(file)
        }
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Synthetic sample data
// ---------------------------------------------------------------------------

/// Parameters for the synthetic dataset: one record per day over the span,
/// numeric measures drawn from fixed distributions, categories from pools.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub regions: Vec<String>,
    pub products: Vec<String>,
    pub categories: Vec<String>,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        let parse = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        SampleConfig {
            start: parse(config::DEFAULT_SAMPLE_START),
            end: parse(config::DEFAULT_SAMPLE_END),
            regions: config::DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            products: config::DEFAULT_PRODUCTS.iter().map(|s| s.to_string()).collect(),
            categories: config::DEFAULT_CATEGORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            seed: config::DEFAULT_SEED,
        }
    }
}

/// Normal deviate via the Box-Muller transform.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Generate the demo dataset: `date`, `sales`, `revenue`, `customers`,
/// `region`, `product`, `category`. Deterministic for a given seed.
pub fn generate_sample(cfg: &SampleConfig) -> Result<Table> {
    if cfg.start > cfg.end {
        bail!("sample date range is empty: {} > {}", cfg.start, cfg.end);
    }
    if cfg.regions.is_empty() || cfg.products.is_empty() || cfg.categories.is_empty() {
        bail!("sample category pools must not be empty");
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let columns: Vec<String> = [
        "date", "sales", "revenue", "customers", "region", "product", "category",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut rows = Vec::new();
    let mut day = cfg.start;
    while day <= cfg.end {
        let mut row = Row::new();
        row.insert("date".into(), CellValue::Date(day));
        row.insert(
            "sales".into(),
            CellValue::Float(gauss(&mut rng, 1000.0, 200.0).abs()),
        );
        row.insert(
            "revenue".into(),
            CellValue::Float(gauss(&mut rng, 50_000.0, 10_000.0).abs()),
        );
        row.insert(
            "customers".into(),
            CellValue::Integer(rng.gen_range(50..500)),
        );
        for (col, pool) in [
            ("region", &cfg.regions),
            ("product", &cfg.products),
            ("category", &cfg.categories),
        ] {
            let pick = pool.choose(&mut rng).context("empty category pool")?;
            row.insert(col.into(), CellValue::String(pick.clone()));
        }
        rows.push(row);

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    log::info!("generated sample dataset with {} rows", rows.len());
    Ok(Table::from_rows(columns, rows))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse CSV from any reader (a file or an uploaded byte stream).
///
/// The header row names the columns. Cell types are guessed per value:
/// integer → float → bool → ISO date → string; empty cells become `Null`.
/// Rows shorter than the header are padded with `Null`; longer rows are a
/// validation failure.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        bail!("CSV has no header row");
    }

    let mut rows = Vec::new();
    for (row_no, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no} has {} fields but the header has {}",
                record.len(),
                headers.len()
            );
        }

        let mut row = Row::new();
        for (col_idx, header) in headers.iter().enumerate() {
            let cell = record.get(col_idx).unwrap_or("");
            row.insert(header.clone(), guess_cell_type(cell));
        }
        rows.push(row);
    }

    log::info!("loaded CSV with {} rows, {} columns", rows.len(), headers.len());
    Ok(Table::from_rows(headers, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return CellValue::Date(d);
        }
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "date": "2023-01-01", "sales": 812.5, "region": "North" },
///   ...
/// ]
/// ```
///
/// Column order follows first appearance across the records, so a table
/// exported to JSON loads back with the same column order.
pub fn load_json_reader<R: Read>(reader: R) -> Result<Table> {
    let root: JsonValue = serde_json::from_reader(reader).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(Table::from_rows(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => CellValue::Date(d),
            Err(_) => CellValue::String(s.clone()),
        },
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}
